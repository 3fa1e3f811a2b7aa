//! Pipeline status overview.
//!
//! Reports what each stage has produced so far: uploaded documents, the
//! chunk artifact and the persisted index. Nothing here constructs an
//! embedding provider, so `ragchat status` never downloads a model.

use anyhow::Result;

use crate::artifact::load_chunks;
use crate::chunk::list_documents;
use crate::config::Config;
use crate::embedding::configured_identity;
use crate::index::{read_info, IndexInfo};

/// Snapshot of the pipeline's on-disk state.
#[derive(Debug)]
pub struct StatusReport {
    pub documents: Vec<String>,
    /// Chunk count from the artifact; `None` when no artifact exists.
    pub artifact_chunks: Option<usize>,
    pub index: Option<IndexInfo>,
    pub configured_model: String,
    /// Configured dimensionality, when known without loading the model.
    pub configured_dims: Option<usize>,
}

impl StatusReport {
    /// Questions can be asked once an index exists.
    pub fn chat_enabled(&self) -> bool {
        self.index.is_some()
    }

    /// Whether the index was built with a different embedding identity than
    /// configured. Dims are compared only when the config determines them.
    pub fn model_mismatch(&self) -> bool {
        self.index.as_ref().is_some_and(|info| {
            info.identity.model != self.configured_model
                || self
                    .configured_dims
                    .is_some_and(|dims| dims != info.identity.dims)
        })
    }
}

/// Gather the status report.
pub async fn collect_status(config: &Config) -> Result<StatusReport> {
    let documents = list_documents(&config.paths.docs_dir)?
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();

    let artifact_chunks = if config.paths.chunks_file.exists() {
        Some(load_chunks(&config.paths.chunks_file)?.len())
    } else {
        None
    };

    let index = read_info(&config.paths.storage_dir).await?;
    let (configured_model, configured_dims) = configured_identity(&config.embedding);

    Ok(StatusReport {
        documents,
        artifact_chunks,
        index,
        configured_model,
        configured_dims,
    })
}

/// `ragchat status`
pub async fn run_status(config: &Config) -> Result<()> {
    let report = collect_status(config).await?;

    println!("ragchat status");
    println!("==============");
    println!();
    println!(
        "  Documents:   {} in {}",
        report.documents.len(),
        config.paths.docs_dir.display()
    );
    for name in &report.documents {
        println!("    - {}", name);
    }

    match report.artifact_chunks {
        Some(n) => println!(
            "  Chunks:      {} in {}",
            n,
            config.paths.chunks_file.display()
        ),
        None => println!("  Chunks:      no artifact yet"),
    }

    match &report.index {
        Some(info) => {
            println!(
                "  Index:       {} documents in {}",
                info.documents,
                config.paths.storage_dir.display()
            );
            println!("  Built with:  {}", info.identity);
            println!("  Updated:     {}", format_ts(info.updated_at));
        }
        None => println!("  Index:       not built"),
    }
    match report.configured_dims {
        Some(dims) => println!(
            "  Embedding:   {} ({} dims, {})",
            report.configured_model, dims, config.embedding.provider
        ),
        None => println!(
            "  Embedding:   {} ({})",
            report.configured_model, config.embedding.provider
        ),
    }
    println!("  LLM:         {} ({})", config.llm.model, config.llm.provider);
    println!();

    if !report.chat_enabled() {
        println!("Questions are disabled until an index is built. Run `ragchat build`.");
    } else if report.model_mismatch() {
        println!("Warning: the configured embedding model differs from the index. Rebuild before asking.");
    } else {
        println!("Ready for questions.");
    }
    Ok(())
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::save_chunks;
    use crate::embedding::{DEFAULT_OLLAMA_MODEL, EmbeddingIdentity};
    use crate::models::Chunk;
    use std::path::Path;

    fn config_in(root: &Path) -> Config {
        let mut config = Config::default();
        config.paths.docs_dir = root.join("docs");
        config.paths.chunks_file = root.join("parsed_chunks.json");
        config.paths.storage_dir = root.join("storage");
        config
    }

    #[tokio::test]
    async fn empty_workspace() {
        let tmp = tempfile::TempDir::new().unwrap();
        let report = collect_status(&config_in(tmp.path())).await.unwrap();
        assert!(report.documents.is_empty());
        assert_eq!(report.artifact_chunks, None);
        assert!(!report.chat_enabled());
        assert!(!report.model_mismatch());
        assert_eq!(report.configured_model, crate::embedding::DEFAULT_LOCAL_MODEL);
    }

    #[tokio::test]
    async fn counts_documents_and_artifact() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = config_in(tmp.path());
        std::fs::create_dir_all(&config.paths.docs_dir).unwrap();
        std::fs::write(config.paths.docs_dir.join("b.pdf"), "x").unwrap();
        std::fs::write(config.paths.docs_dir.join("a.pdf"), "x").unwrap();
        std::fs::write(config.paths.docs_dir.join("notes.txt"), "x").unwrap();
        save_chunks(
            &config.paths.chunks_file,
            &[Chunk {
                file_name: "a.pdf".to_string(),
                page_num: 1,
                chunk_num: 1,
                text: "Hello.".to_string(),
            }],
        )
        .unwrap();

        let report = collect_status(&config).await.unwrap();
        assert_eq!(report.documents, vec!["a.pdf", "b.pdf"]);
        assert_eq!(report.artifact_chunks, Some(1));
    }

    #[tokio::test]
    async fn configured_model_follows_provider() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = config_in(tmp.path());
        config.embedding.provider = "ollama".to_string();
        let report = collect_status(&config).await.unwrap();
        assert_eq!(report.configured_model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(report.configured_dims, Some(768));

        config.embedding.model = Some("mxbai-embed-large".to_string());
        let report = collect_status(&config).await.unwrap();
        assert_eq!(report.configured_model, "mxbai-embed-large");
        assert_eq!(report.configured_dims, Some(1024));
    }

    fn report_for(built: EmbeddingIdentity, model: &str, dims: Option<usize>) -> StatusReport {
        StatusReport {
            documents: Vec::new(),
            artifact_chunks: None,
            index: Some(IndexInfo {
                identity: built,
                documents: 1,
                updated_at: 0,
            }),
            configured_model: model.to_string(),
            configured_dims: dims,
        }
    }

    #[test]
    fn mismatch_compares_dims_when_known() {
        let built = || EmbeddingIdentity {
            model: "nomic-embed-text".to_string(),
            dims: 768,
        };
        assert!(!report_for(built(), "nomic-embed-text", Some(768)).model_mismatch());
        assert!(report_for(built(), "nomic-embed-text", Some(512)).model_mismatch());
        assert!(report_for(built(), "all-minilm", Some(768)).model_mismatch());
        // Unknown dims fall back to the name alone.
        assert!(!report_for(built(), "nomic-embed-text", None).model_mismatch());
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_ts(0), "1970-01-01 00:00:00 UTC");
    }
}
