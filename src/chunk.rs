//! Sentence-boundary chunker.
//!
//! Turns a folder of documents into an ordered sequence of [`Chunk`]s. Each
//! page's text is cut after every `.`, `!` or `?` that is followed by
//! whitespace; each piece is trimmed, empty pieces are dropped, and the
//! survivors are numbered from 1 within their page.
//!
//! The boundary rule is a heuristic. It splits after abbreviations such as
//! `e.g. ` or `Dr. ` and keeps decimals like `3.14` intact only because no
//! whitespace follows the dot. Chunk numbers are part of every citation, so
//! the rule must stay stable across releases.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::WalkDir;

use crate::extract::{is_supported_document, TextExtractor};
use crate::models::Chunk;

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence boundary pattern is valid"))
}

/// Split text into raw sentence-like units, untrimmed, possibly empty.
///
/// The terminating punctuation stays with its unit; the whitespace run after
/// it is consumed.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    for m in sentence_boundary().find_iter(text) {
        // Terminators are single-byte ASCII, so +1 stays on a char boundary.
        units.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    units.push(&text[start..]);
    units
}

/// Chunk one page. Numbering counts surviving units only.
pub fn chunk_page(file_name: &str, page_num: u32, text: &str) -> Vec<Chunk> {
    split_sentences(text)
        .into_iter()
        .map(str::trim)
        .filter(|unit| !unit.is_empty())
        .zip(1u32..)
        .map(|(unit, chunk_num)| Chunk {
            file_name: file_name.to_string(),
            page_num,
            chunk_num,
            text: unit.to_string(),
        })
        .collect()
}

/// Chunk every page of one document, pages in physical order.
pub fn chunk_document(file_name: &str, pages: &[String]) -> Vec<Chunk> {
    pages
        .iter()
        .zip(1u32..)
        .flat_map(|(text, page_num)| chunk_page(file_name, page_num, text))
        .collect()
}

/// List the accepted documents directly inside `dir`, ordered by file name.
///
/// A directory that does not exist holds no documents.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "documents directory does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Failed to list documents in {}", dir.display()))?;
        if entry.file_type().is_file() && is_supported_document(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Extract and chunk every accepted document in `dir`.
///
/// An empty folder yields an empty sequence. Extraction errors are not
/// recovered; they abort the whole run.
pub fn extract_folder(dir: &Path, extractor: &dyn TextExtractor) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();

    for path in list_documents(dir)? {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let pages = extractor
            .extract_pages(&path)
            .with_context(|| format!("Failed to extract text from {}", path.display()))?;

        let doc_chunks = chunk_document(&file_name, &pages);
        tracing::info!(
            file = %file_name,
            pages = pages.len(),
            chunks = doc_chunks.len(),
            "extracted document"
        );
        chunks.extend(doc_chunks);
    }

    Ok(chunks)
}
