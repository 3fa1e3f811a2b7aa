//! Per-page text extraction for uploaded documents.
//!
//! Extraction is a collaborator boundary: the chunker asks a
//! [`TextExtractor`] for the raw text of every page of a file, in physical
//! page order, and never looks at the bytes itself. Pages without a text
//! layer come back as empty strings.

use std::path::Path;

/// File extension (lowercase, without the dot) of documents the pipeline accepts.
pub const PDF_EXTENSION: &str = "pdf";

/// Extraction error. Not recovered anywhere: it aborts the current run.
#[derive(Debug)]
pub enum ExtractError {
    Io(String),
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "failed to read document: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Source of per-page raw text.
pub trait TextExtractor {
    /// Returns one string per page, in page order. A page with no
    /// extractable text yields `""`.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractError>;
}

/// [`TextExtractor`] backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
        extract_pdf_pages(&bytes)
    }
}

/// Extract the text of every page of an in-memory PDF.
pub fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Whether `path` names a document the pipeline accepts (case-insensitive suffix).
pub fn is_supported_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION))
        .unwrap_or(false)
}
