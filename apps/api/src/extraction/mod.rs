// Text Extractor: turns an uploaded resume into plain text.
// PDF parsing is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod pdf;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

pub use pdf::extract_pdf_text;

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("PDF extraction aborted: {0}")]
    Aborted(String),

    #[error("uploaded file is neither a PDF nor UTF-8 text")]
    NotText,
}

/// How an upload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

/// A file part received from the analyze form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// PDF when the bytes, the filename or the declared content type say so.
    pub fn kind(&self) -> DocumentKind {
        let by_magic = self.bytes.starts_with(PDF_MAGIC);
        let by_name = self
            .file_name
            .as_deref()
            .map(|n| n.to_ascii_lowercase().ends_with(".pdf"))
            .unwrap_or(false);
        let by_type = self
            .content_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("application/pdf"))
            .unwrap_or(false);

        if by_magic || by_name || by_type {
            DocumentKind::Pdf
        } else {
            DocumentKind::PlainText
        }
    }
}

/// Extracts normalised text from an upload. A PDF with no extractable text yields an
/// empty string; deciding whether that is acceptable is up to the caller.
pub async fn extract_document(file: UploadedFile) -> Result<String, ExtractionError> {
    match file.kind() {
        DocumentKind::Pdf => {
            debug!(
                "Extracting PDF text ({} bytes, name={:?})",
                file.bytes.len(),
                file.file_name
            );
            let bytes = file.bytes;
            // pdf-extract panics on some malformed documents; the JoinError catches it.
            tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
                .await
                .map_err(|e| ExtractionError::Aborted(e.to_string()))?
        }
        DocumentKind::PlainText => {
            let text = std::str::from_utf8(&file.bytes).map_err(|_| ExtractionError::NotText)?;
            Ok(normalize_text(text))
        }
    }
}

/// Plain-text path: surrounding whitespace is trimmed, nothing else changes.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_string()
}
