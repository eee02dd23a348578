use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::normalize_text;

/// Resume text that is known to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeContent(String);

impl ResumeContent {
    /// Returns `None` when the text is blank after trimming.
    pub fn new(text: &str) -> Option<Self> {
        let text = normalize_text(text);
        (!text.is_empty()).then_some(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Job description exactly as the user entered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescription(String);

impl JobDescription {
    /// Rejects blank input. The original text, surrounding whitespace included, is kept.
    pub fn new(text: String) -> Result<Self, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::MissingInput(
                "Please paste the job description.".to_string(),
            ));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Accumulates streamed fragments in arrival order.
#[derive(Debug, Default, Clone)]
pub struct ModelResponse {
    text: String,
    fragments: usize,
}

impl ModelResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment and returns the cumulative text.
    pub fn push(&mut self, fragment: &str) -> &str {
        self.text.push_str(fragment);
        self.fragments += 1;
        &self.text
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// What the parser could pull out of a model reply. Absence is normal, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResult {
    pub score: Option<u32>,
    pub missing_skills: Vec<String>,
}

impl ParsedResult {
    /// Fraction for a progress bar, clamped to `0.0..=1.0`.
    pub fn progress(&self) -> Option<f32> {
        self.score.map(|s| (s as f32 / 100.0).clamp(0.0, 1.0))
    }

    pub fn score_label(&self) -> Option<String> {
        self.score.map(|s| format!("{s}% match"))
    }
}

/// Final payload rendered after the stream completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub model: String,
    pub response: String,
    pub score: Option<u32>,
    pub missing_skills: Vec<String>,
    pub progress: Option<f32>,
    pub score_label: Option<String>,
    /// The model stream broke before completing; fields reflect the text received so far.
    pub interrupted: bool,
}

impl AnalysisReport {
    pub fn new(analysis_id: Uuid, model: &str, response: String, parsed: ParsedResult) -> Self {
        Self {
            analysis_id,
            model: model.to_string(),
            progress: parsed.progress(),
            score_label: parsed.score_label(),
            score: parsed.score,
            missing_skills: parsed.missing_skills,
            response,
            interrupted: false,
        }
    }

    pub fn interrupted(mut self) -> Self {
        self.interrupted = true;
        self
    }
}

/// Events produced by a running analysis, in order: any number of `Delta`s, then exactly
/// one of `Completed` or `Failed`. Serialized as-is into SSE `data` payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    Delta { text: String },
    Completed(AnalysisReport),
    /// `partial` is the parse of whatever arrived before the stream broke.
    Failed {
        message: String,
        partial: AnalysisReport,
    },
}

impl AnalysisEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisEvent::Delta { .. } => "delta",
            AnalysisEvent::Completed(_) => "completed",
            AnalysisEvent::Failed { .. } => "error",
        }
    }
}
