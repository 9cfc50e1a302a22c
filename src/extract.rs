//! PDF text extraction.
//!
//! Uploads arrive as raw bytes; this module returns plain UTF-8 text or an
//! [`ExtractError`]. Extraction never panics: `pdf-extract` panics on some
//! malformed inputs, so it runs under `catch_unwind`.

/// Extraction failure.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("PDF contains no extractable text")]
    NoText,
}

/// True when `filename` has a `.pdf` extension (case-insensitive).
pub fn is_pdf_filename(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Extract plain text from PDF bytes. Blank output is [`ExtractError::NoText`].
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked".to_string()))?;
    let text = result.map_err(|e| ExtractError::Pdf(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(ExtractError::NoText);
    }
    Ok(text)
}
