//! The chunk artifact: a pretty-printed JSON array of every chunk from the
//! last extraction run.
//!
//! Written once per upload batch, overwriting the previous file. It exists
//! for inspection only; indexing always re-extracts from the documents
//! directory.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::models::Chunk;

/// Write `chunks` to `path` as UTF-8 JSON, replacing any existing file.
pub fn save_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let json = serde_json::to_string_pretty(chunks)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write chunk artifact: {}", path.display()))?;

    tracing::debug!(path = %path.display(), chunks = chunks.len(), "wrote chunk artifact");
    Ok(())
}

/// Read a chunk artifact back, preserving order.
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk artifact: {}", path.display()))?;
    let chunks = serde_json::from_str(&content)
        .with_context(|| format!("Invalid chunk artifact: {}", path.display()))?;
    Ok(chunks)
}

/// Chunks matching the optional file and page filters, capped at `limit`.
pub fn select_chunks<'a>(
    chunks: &'a [Chunk],
    file: Option<&str>,
    page: Option<u32>,
    limit: Option<usize>,
) -> Vec<&'a Chunk> {
    chunks
        .iter()
        .filter(|c| file.map_or(true, |f| c.file_name == f))
        .filter(|c| page.map_or(true, |p| c.page_num == p))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// `ragchat chunks`: print chunks from the artifact.
pub fn run_chunks(
    config: &Config,
    file: Option<&str>,
    page: Option<u32>,
    limit: Option<usize>,
) -> Result<()> {
    let path = &config.paths.chunks_file;
    if !path.exists() {
        anyhow::bail!(
            "No chunk artifact at {}. Run `ragchat extract` or `ragchat upload` first.",
            path.display()
        );
    }

    let chunks = load_chunks(path)?;
    let selected = select_chunks(&chunks, file, page, limit);
    if selected.is_empty() {
        println!("No matching chunks.");
        return Ok(());
    }

    for chunk in &selected {
        println!(
            "{} (Page {}, Chunk {})",
            chunk.file_name, chunk.page_num, chunk.chunk_num
        );
        println!("    {}", chunk.text);
    }
    println!();
    println!("{} of {} chunks shown.", selected.len(), chunks.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Chunk> {
        vec![
            Chunk {
                file_name: "zeta.pdf".to_string(),
                page_num: 3,
                chunk_num: 1,
                text: "Ünïcödé and \"quotes\" survive.".to_string(),
            },
            Chunk {
                file_name: "alpha.pdf".to_string(),
                page_num: 1,
                chunk_num: 2,
                text: "Order is kept, not sorted!".to_string(),
            },
        ]
    }

    #[test]
    fn test_round_trip_preserves_order_and_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out").join("parsed_chunks.json");
        let chunks = sample();
        save_chunks(&path, &chunks).unwrap();
        assert_eq!(load_chunks(&path).unwrap(), chunks);
    }

    #[test]
    fn test_field_names_and_types() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("parsed_chunks.json");
        save_chunks(&path, &sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let first = &raw.as_array().unwrap()[0];
        assert_eq!(first["file_name"], "zeta.pdf");
        assert_eq!(first["page_num"], 3);
        assert_eq!(first["chunk_num"], 1);
        assert!(first["text"].is_string());
        assert_eq!(first.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_overwrites_previous_batch() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("parsed_chunks.json");
        save_chunks(&path, &sample()).unwrap();
        save_chunks(&path, &[]).unwrap();
        assert!(load_chunks(&path).unwrap().is_empty());
    }

    #[test]
    fn test_select_filters_in_order() {
        let mut chunks = sample();
        chunks.push(Chunk {
            file_name: "alpha.pdf".to_string(),
            page_num: 2,
            chunk_num: 1,
            text: "Later page.".to_string(),
        });

        let alpha = select_chunks(&chunks, Some("alpha.pdf"), None, None);
        assert_eq!(alpha.len(), 2);
        assert_eq!(alpha[0].page_num, 1);

        let page_two = select_chunks(&chunks, Some("alpha.pdf"), Some(2), None);
        assert_eq!(page_two.len(), 1);
        assert_eq!(page_two[0].text, "Later page.");

        assert_eq!(select_chunks(&chunks, None, None, Some(1))[0].file_name, "zeta.pdf");
        assert!(select_chunks(&chunks, Some("missing.pdf"), None, None).is_empty());
    }
}
