//! Upload and extraction commands.
//!
//! Uploading copies documents into the documents directory, then re-extracts
//! the whole directory and overwrites the chunk artifact. Indexing is never
//! triggered here; run `ragchat build` explicitly.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::artifact::save_chunks;
use crate::chunk::extract_folder;
use crate::config::Config;
use crate::extract::{is_supported_document, PdfExtractor, TextExtractor};
use crate::models::Chunk;

/// Copy `files` into `docs_dir`, keeping their file names.
///
/// A file with the same name as an earlier upload replaces it. Every path is
/// checked before anything is copied, so a bad argument copies nothing.
pub fn store_uploads(files: &[PathBuf], docs_dir: &Path) -> Result<Vec<PathBuf>> {
    for file in files {
        if !is_supported_document(file) {
            bail!("Not a PDF document: {}", file.display());
        }
        if !file.is_file() {
            bail!("File not found: {}", file.display());
        }
    }

    std::fs::create_dir_all(docs_dir)
        .with_context(|| format!("Failed to create documents directory: {}", docs_dir.display()))?;

    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        let name = file
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", file.display()))?;
        let dest = docs_dir.join(name);
        if is_same_file(file, &dest)? {
            tracing::debug!(file = %dest.display(), "already in documents directory");
            stored.push(dest);
            continue;
        }
        std::fs::copy(file, &dest).with_context(|| {
            format!("Failed to copy {} to {}", file.display(), dest.display())
        })?;
        tracing::info!(file = %dest.display(), "stored upload");
        stored.push(dest);
    }
    Ok(stored)
}

// Copying a file onto itself truncates it before reading.
fn is_same_file(src: &Path, dest: &Path) -> Result<bool> {
    if !dest.exists() {
        return Ok(false);
    }
    let src = std::fs::canonicalize(src)
        .with_context(|| format!("Failed to resolve {}", src.display()))?;
    let dest = std::fs::canonicalize(dest)
        .with_context(|| format!("Failed to resolve {}", dest.display()))?;
    Ok(src == dest)
}

/// Extract every document in `docs_dir` and overwrite the chunk artifact.
pub fn extract_and_save(
    docs_dir: &Path,
    chunks_file: &Path,
    extractor: &dyn TextExtractor,
) -> Result<Vec<Chunk>> {
    let chunks = extract_folder(docs_dir, extractor)?;
    save_chunks(chunks_file, &chunks)?;
    Ok(chunks)
}

/// `ragchat upload <files>...`
pub fn run_upload(config: &Config, files: &[PathBuf]) -> Result<()> {
    if files.is_empty() {
        bail!("No files given to upload.");
    }

    let stored = store_uploads(files, &config.paths.docs_dir)?;
    println!("Uploaded {} file(s) to {}.", stored.len(), config.paths.docs_dir.display());

    let chunks = extract_and_save(&config.paths.docs_dir, &config.paths.chunks_file, &PdfExtractor)?;
    println!("Extracted {} chunks from uploaded PDFs.", chunks.len());
    println!("Run `ragchat build` to index them.");
    Ok(())
}

/// `ragchat extract`
pub fn run_extract(config: &Config) -> Result<()> {
    let chunks = extract_and_save(&config.paths.docs_dir, &config.paths.chunks_file, &PdfExtractor)?;
    println!(
        "Extracted {} chunks from {}.",
        chunks.len(),
        config.paths.docs_dir.display()
    );
    println!("Chunks written to {}.", config.paths.chunks_file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::load_chunks;
    use crate::extract::ExtractError;

    struct OnePageExtractor;

    impl TextExtractor for OnePageExtractor {
        fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
            let body = std::fs::read_to_string(path).map_err(|e| ExtractError::Io(e.to_string()))?;
            Ok(vec![body])
        }
    }

    #[test]
    fn store_uploads_copies_and_replaces() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("incoming");
        std::fs::create_dir_all(&src).unwrap();
        let file = src.join("Report.PDF");
        std::fs::write(&file, "v1").unwrap();

        let docs = tmp.path().join("docs");
        let stored = store_uploads(&[file.clone()], &docs).unwrap();
        assert_eq!(stored, vec![docs.join("Report.PDF")]);

        std::fs::write(&file, "v2").unwrap();
        store_uploads(&[file], &docs).unwrap();
        assert_eq!(std::fs::read_to_string(docs.join("Report.PDF")).unwrap(), "v2");
    }

    #[test]
    fn store_uploads_rejects_before_copying() {
        let tmp = tempfile::TempDir::new().unwrap();
        let good = tmp.path().join("good.pdf");
        let bad = tmp.path().join("notes.txt");
        std::fs::write(&good, "x").unwrap();
        std::fs::write(&bad, "x").unwrap();

        let docs = tmp.path().join("docs");
        assert!(store_uploads(&[good.clone(), bad], &docs).is_err());
        assert!(!docs.join("good.pdf").exists());

        let missing = tmp.path().join("missing.pdf");
        assert!(store_uploads(&[good, missing], &docs).is_err());
    }

    #[test]
    fn store_uploads_keeps_file_already_in_docs_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        let existing = docs.join("a.pdf");
        std::fs::write(&existing, "original bytes").unwrap();

        let stored = store_uploads(&[existing.clone()], &docs).unwrap();
        assert_eq!(stored, vec![docs.join("a.pdf")]);
        assert_eq!(std::fs::read(&existing).unwrap(), b"original bytes");

        // Same file reached through a different path spelling.
        let roundabout = docs.join("..").join("docs").join("a.pdf");
        store_uploads(&[roundabout], &docs).unwrap();
        assert_eq!(std::fs::read(&existing).unwrap(), b"original bytes");
    }

    #[test]
    fn extract_and_save_writes_artifact() {
        let tmp = tempfile::TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("cat.pdf"), "The cat sat. It slept! Is it happy?").unwrap();
        let artifact = tmp.path().join("parsed_chunks.json");

        let chunks = extract_and_save(&docs, &artifact, &OnePageExtractor).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(load_chunks(&artifact).unwrap(), chunks);
    }
}
