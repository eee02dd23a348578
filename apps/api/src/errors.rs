use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// No resume or no job description. Raised before any model call.
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Model request failed: {0}")]
    ModelRequestFailed(#[from] LlmError),

    /// Multipart read failure, keeping the status axum chose (413 for an oversized body).
    #[error("Upload rejected ({status}): {message}")]
    Upload { status: StatusCode, message: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        AppError::ExtractionFailed(e.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Upload {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::MissingInput(msg) => (StatusCode::BAD_REQUEST, "MISSING_INPUT", msg.clone()),
            AppError::ExtractionFailed(msg) => {
                tracing::warn!("Extraction failed: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "EXTRACTION_FAILED",
                    "Failed to extract text from the uploaded resume.".to_string(),
                )
            }
            AppError::ModelRequestFailed(e) => {
                tracing::error!("Model request failed: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MODEL_REQUEST_FAILED",
                    "The analysis model could not be reached.".to_string(),
                )
            }
            AppError::Upload { status, message } => {
                let code = if *status == StatusCode::PAYLOAD_TOO_LARGE {
                    "PAYLOAD_TOO_LARGE"
                } else {
                    "VALIDATION_ERROR"
                };
                (*status, code, format!("Malformed form data: {message}"))
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
