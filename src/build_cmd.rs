use anyhow::Result;

use crate::chunk::extract_folder;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::extract::PdfExtractor;
use crate::index::build_index;
use crate::progress::ProgressMode;

/// Re-extract the documents directory and build the index from it.
///
/// The artifact is not consulted; chunks always come straight from the PDFs.
pub async fn run_build(
    config: &Config,
    embedder: &dyn EmbeddingProvider,
    progress: ProgressMode,
) -> Result<()> {
    let chunks = extract_folder(&config.paths.docs_dir, &PdfExtractor)?;
    if chunks.is_empty() {
        println!("build");
        println!(
            "  no chunks extracted from {}; upload PDFs first",
            config.paths.docs_dir.display()
        );
        return Ok(());
    }

    let reporter = progress.reporter();
    let (index, stats) = build_index(
        &chunks,
        embedder,
        &config.paths.storage_dir,
        config.embedding.batch_size,
        reporter.as_ref(),
    )
    .await?;
    index.close().await;

    println!("build");
    println!("  model:     {}", embedder.identity());
    println!("  documents: {}", stats.documents);
    println!("  embedded:  {}", stats.embedded);
    println!("  unchanged: {}", stats.unchanged);
    println!("  total:     {}", stats.total);
    println!("  storage:   {}", config.paths.storage_dir.display());
    Ok(())
}
