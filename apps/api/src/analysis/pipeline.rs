//! Analysis pipeline: resume normalisation → prompt → streamed completion → single parse.

use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::models::{
    AnalysisEvent, AnalysisReport, JobDescription, ModelResponse, ResumeContent,
};
use crate::analysis::parser::parse_llm_output;
use crate::analysis::prompts::build_prompt;
use crate::errors::AppError;
use crate::extraction::{extract_document, UploadedFile};
use crate::llm_client::CompletionModel;

const EVENT_BUFFER: usize = 100;

/// Raw resume input as submitted by the form.
#[derive(Debug, Default)]
pub struct ResumeInput {
    pub file: Option<UploadedFile>,
    pub pasted_text: Option<String>,
}

/// Produces `ResumeContent` from an upload, falling back to pasted text.
///
/// An uploaded file takes precedence over pasted text. A file that yields no text is an
/// extraction failure, not a fallback to the pasted text.
pub async fn resolve_resume(input: ResumeInput) -> Result<ResumeContent, AppError> {
    if let Some(file) = input.file.filter(|f| !f.bytes.is_empty()) {
        let text = extract_document(file).await?;
        return ResumeContent::new(&text).ok_or_else(|| {
            AppError::ExtractionFailed("no text could be extracted from the upload".to_string())
        });
    }

    input
        .pasted_text
        .as_deref()
        .and_then(ResumeContent::new)
        .ok_or_else(|| AppError::MissingInput("Please upload or paste a resume.".to_string()))
}

/// A started analysis: the stream is open and events are flowing.
pub struct RunningAnalysis {
    pub analysis_id: Uuid,
    pub events: mpsc::Receiver<AnalysisEvent>,
}

/// Opens the model stream and forwards its fragments as `AnalysisEvent`s.
///
/// Errors while opening the stream are returned directly so callers can answer with an
/// HTTP error. After that, a transport failure becomes a final `Failed` event carrying the
/// report parsed from whatever text arrived. The parser runs exactly once, after the last
/// fragment or the failure.
pub async fn start_analysis(
    model: &dyn CompletionModel,
    resume: &ResumeContent,
    job_description: &JobDescription,
) -> Result<RunningAnalysis, AppError> {
    let analysis_id = Uuid::new_v4();
    let prompt = build_prompt(resume.as_str(), job_description.as_str());
    let model_name = model.model_name().to_string();

    info!(
        %analysis_id,
        model = %model_name,
        resume_chars = resume.as_str().chars().count(),
        "Starting analysis"
    );

    let mut fragments = model.stream_completion(&prompt).await?;
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        let mut response = ModelResponse::new();

        while let Some(item) = fragments.recv().await {
            match item {
                Ok(fragment) => {
                    response.push(&fragment);
                    if tx.send(AnalysisEvent::Delta { text: fragment }).await.is_err() {
                        info!(%analysis_id, "Client went away; dropping analysis stream");
                        return;
                    }
                }
                Err(e) => {
                    warn!(%analysis_id, "Model stream failed: {e}");
                    let partial = finish_report(analysis_id, &model_name, response).interrupted();
                    let _ = tx
                        .send(AnalysisEvent::Failed {
                            message: "The analysis stream was interrupted.".to_string(),
                            partial,
                        })
                        .await;
                    return;
                }
            }
        }

        let report = finish_report(analysis_id, &model_name, response);
        let _ = tx.send(AnalysisEvent::Completed(report)).await;
    });

    Ok(RunningAnalysis {
        analysis_id,
        events: rx,
    })
}

/// Parses the accumulated text once. A truncated response is parsed as-is.
fn finish_report(analysis_id: Uuid, model_name: &str, response: ModelResponse) -> AnalysisReport {
    let fragment_count = response.fragment_count();
    let text = response.into_text();
    let parsed = parse_llm_output(&text);

    info!(
        %analysis_id,
        fragments = fragment_count,
        score = ?parsed.score,
        missing_skills = parsed.missing_skills.len(),
        "Analysis parsed"
    );

    AnalysisReport::new(analysis_id, model_name, text, parsed)
}

/// Drains a running analysis into its final report. An interrupted stream still yields
/// the report parsed from the partial text, flagged `interrupted`.
pub async fn collect_report(mut analysis: RunningAnalysis) -> Result<AnalysisReport, AppError> {
    while let Some(event) = analysis.events.recv().await {
        match event {
            AnalysisEvent::Delta { .. } => {}
            AnalysisEvent::Completed(report) => return Ok(report),
            AnalysisEvent::Failed { message, partial } => {
                warn!(
                    analysis_id = %analysis.analysis_id,
                    "Returning partial report: {message}"
                );
                return Ok(partial);
            }
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "analysis {} ended without a result",
        analysis.analysis_id
    )))
}
