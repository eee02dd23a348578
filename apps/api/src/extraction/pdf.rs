//! PDF text extraction via `pdf-extract`, one page at a time.

use super::ExtractionError;

/// Extracts every page of a PDF and joins the non-empty ones with `\n`.
///
/// Runs synchronously and can be slow on large documents; call it from
/// `tokio::task::spawn_blocking`.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    Ok(join_pages(pages))
}

/// Trims each page, drops pages that produced no text, and joins the rest in page order.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = pages
        .into_iter()
        .filter_map(|page| {
            let text = page.as_ref().trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n");
    joined.trim().to_string()
}
