//! Citation formatting and the answer validity rule.
//!
//! A citation is derived from a retrieved chunk's metadata at answer time:
//!
//! | Metadata present | Citation |
//! |------------------|----------|
//! | file, page, chunk | `a.pdf (Page 2, Chunk 5)` |
//! | file, page | `a.pdf (Page 2)` |
//! | anything less | none |
//!
//! Empty file names and zero page/chunk numbers count as absent.
//!
//! An answer is only shown together with at least one citation. When no
//! citation can be derived, or the model's answer is blank, the turn carries
//! [`NO_ANSWER`] and no sources.

use crate::models::{ChunkMetadata, RetrievedChunk};

/// Answer recorded whenever evidence is insufficient or generation failed.
pub const NO_ANSWER: &str = "No answer found.";

/// Format one citation, or `None` when file or page is missing.
pub fn format_citation(metadata: &ChunkMetadata) -> Option<String> {
    let file = metadata.file_name.as_deref().filter(|f| !f.is_empty())?;
    let page = metadata.page_num.filter(|p| *p > 0)?;
    Some(match metadata.chunk_num.filter(|c| *c > 0) {
        Some(chunk) => format!("{} (Page {}, Chunk {})", file, page, chunk),
        None => format!("{} (Page {})", file, page),
    })
}

/// Citations for every retrieved chunk that carries enough metadata, in rank order.
pub fn collect_citations(retrieved: &[RetrievedChunk]) -> Vec<String> {
    retrieved
        .iter()
        .filter_map(|hit| format_citation(&hit.metadata))
        .collect()
}

/// Apply the validity rule to a generated answer and its citations.
///
/// `answer` is `None` when generation failed.
pub fn finalize_answer(answer: Option<String>, sources: Vec<String>) -> (String, Vec<String>) {
    match answer {
        Some(text) if !text.trim().is_empty() && !sources.is_empty() => (text, sources),
        _ => (NO_ANSWER.to_string(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(file: Option<&str>, page: Option<u32>, chunk: Option<u32>) -> ChunkMetadata {
        ChunkMetadata {
            file_name: file.map(str::to_string),
            page_num: page,
            chunk_num: chunk,
        }
    }

    fn hit(metadata: ChunkMetadata) -> RetrievedChunk {
        RetrievedChunk {
            text: "text".to_string(),
            metadata,
            score: 1.0,
        }
    }

    #[test]
    fn full_citation() {
        assert_eq!(
            format_citation(&meta(Some("a.pdf"), Some(2), Some(5))).as_deref(),
            Some("a.pdf (Page 2, Chunk 5)")
        );
    }

    #[test]
    fn page_only_citation() {
        assert_eq!(
            format_citation(&meta(Some("a.pdf"), Some(2), None)).as_deref(),
            Some("a.pdf (Page 2)")
        );
        assert_eq!(
            format_citation(&meta(Some("a.pdf"), Some(2), Some(0))).as_deref(),
            Some("a.pdf (Page 2)")
        );
    }

    #[test]
    fn insufficient_metadata_is_omitted() {
        assert_eq!(format_citation(&meta(None, Some(2), Some(5))), None);
        assert_eq!(format_citation(&meta(Some("a.pdf"), None, Some(5))), None);
        assert_eq!(format_citation(&meta(Some(""), Some(2), Some(5))), None);
        assert_eq!(format_citation(&meta(Some("a.pdf"), Some(0), Some(5))), None);
        assert_eq!(format_citation(&ChunkMetadata::default()), None);
    }

    #[test]
    fn collect_skips_unusable_hits() {
        let hits = vec![
            hit(meta(Some("a.pdf"), Some(1), Some(1))),
            hit(meta(None, None, None)),
            hit(meta(Some("b.pdf"), Some(3), None)),
        ];
        assert_eq!(
            collect_citations(&hits),
            vec!["a.pdf (Page 1, Chunk 1)", "b.pdf (Page 3)"]
        );
    }

    #[test]
    fn valid_answer_passes_through() {
        let (answer, sources) = finalize_answer(
            Some("It slept.".to_string()),
            vec!["a.pdf (Page 1, Chunk 2)".to_string()],
        );
        assert_eq!(answer, "It slept.");
        assert_eq!(sources, vec!["a.pdf (Page 1, Chunk 2)"]);
    }

    #[test]
    fn answer_without_citation_is_suppressed() {
        let (answer, sources) = finalize_answer(Some("Confident text".to_string()), vec![]);
        assert_eq!(answer, NO_ANSWER);
        assert!(sources.is_empty());
    }

    #[test]
    fn blank_answer_drops_citations() {
        let (answer, sources) =
            finalize_answer(Some("  \n ".to_string()), vec!["a.pdf (Page 1)".to_string()]);
        assert_eq!(answer, NO_ANSWER);
        assert!(sources.is_empty());
    }

    #[test]
    fn failed_generation_is_no_answer() {
        let (answer, sources) = finalize_answer(None, vec!["a.pdf (Page 1)".to_string()]);
        assert_eq!(answer, NO_ANSWER);
        assert!(sources.is_empty());
    }
}
