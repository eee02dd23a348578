//! Axum route handlers for the Analysis API.

use std::convert::Infallible;

use axum::{
    extract::{Multipart, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};

use crate::analysis::models::{AnalysisEvent, AnalysisReport, JobDescription, ResumeContent};
use crate::analysis::pipeline::{collect_report, resolve_resume, start_analysis, ResumeInput};
use crate::errors::AppError;
use crate::extraction::UploadedFile;
use crate::state::AppState;

const RESUME_FILE_FIELD: &str = "resume_file";
const RESUME_TEXT_FIELD: &str = "resume_text";
const JOB_DESCRIPTION_FIELD: &str = "job_description";

/// The analyze form after reading every multipart field.
#[derive(Debug, Default)]
pub struct AnalyzeForm {
    pub resume: ResumeInput,
    pub job_description: Option<String>,
}

impl AnalyzeForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = AnalyzeForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                RESUME_FILE_FIELD => {
                    let file_name = field.file_name().map(String::from);
                    let content_type = field.content_type().map(String::from);
                    let bytes = field.bytes().await?;
                    form.resume.file = Some(UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                RESUME_TEXT_FIELD => form.resume.pasted_text = Some(field.text().await?),
                JOB_DESCRIPTION_FIELD => form.job_description = Some(field.text().await?),
                other => debug!("Ignoring unknown form field '{other}'"),
            }
        }

        Ok(form)
    }

    /// Normalises the resume and checks the job description. Runs before any model call.
    pub async fn validate(self) -> Result<(ResumeContent, JobDescription), AppError> {
        let resume = resolve_resume(self.resume).await?;
        let job_description = JobDescription::new(self.job_description.unwrap_or_default())?;
        Ok((resume, job_description))
    }
}

/// POST /api/v1/analyze
///
/// Streams the model output as SSE `delta` events, then a single `completed` event with
/// the parsed report. If the stream breaks, an `error` event carries the report parsed
/// from the partial text instead.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (resume, job_description) = AnalyzeForm::from_multipart(multipart)
        .await?
        .validate()
        .await?;

    let analysis = start_analysis(state.model.as_ref(), &resume, &job_description).await?;
    let stream = ReceiverStream::new(analysis.events).map(|event| Ok(to_sse_event(&event)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /api/v1/analyze/report
///
/// Same flow as `/analyze`, but waits for the stream to finish and returns the report.
pub async fn handle_analyze_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisReport>, AppError> {
    let (resume, job_description) = AnalyzeForm::from_multipart(multipart)
        .await?
        .validate()
        .await?;

    let analysis = start_analysis(state.model.as_ref(), &resume, &job_description).await?;
    let report = collect_report(analysis).await?;
    Ok(Json(report))
}

fn to_sse_event(event: &AnalysisEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event)
        .unwrap_or_else(|e| {
            error!("Failed to encode SSE payload: {e}");
            Event::default().event("error").data("encoding failure")
        })
}
