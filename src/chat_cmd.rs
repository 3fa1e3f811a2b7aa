//! `ragchat ask` and `ragchat chat`.
//!
//! Both refuse to run until an index exists. A failed retrieval or model call
//! is printed and the turn resolves to the no-answer sentinel; the chat loop
//! keeps going.

use std::io::Write;

use anyhow::{bail, Result};
use tokio::io::AsyncBufReadExt;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::index::{index_exists, SqliteIndex};
use crate::llm::LanguageModel;
use crate::query::{answer_question, ask};
use crate::session::ChatSession;

/// Fail unless an index has been built.
///
/// Run before constructing the embedding provider so a missing index is
/// reported without loading or downloading a model.
pub fn ensure_index(config: &Config) -> Result<()> {
    if !index_exists(&config.paths.storage_dir) {
        bail!("Questions are disabled until an index is built. Upload PDFs and run `ragchat build`.");
    }
    Ok(())
}

async fn open_index<'e>(
    config: &Config,
    embedder: &'e dyn EmbeddingProvider,
) -> Result<SqliteIndex<'e>> {
    SqliteIndex::load(&config.paths.storage_dir, embedder).await
}

/// Answer a single question and print the answer with its citations.
pub async fn run_ask(
    config: &Config,
    embedder: &dyn EmbeddingProvider,
    model: &dyn LanguageModel,
    question: &str,
) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        bail!("Question is empty.");
    }

    let index = open_index(config, embedder).await?;
    let outcome = answer_question(&index, model, question, config.retrieval.top_k).await;
    index.close().await;

    if let Some(err) = &outcome.error {
        println!("{}", err);
    }
    println!("{}", outcome.turn.answer);
    if !outcome.turn.sources.is_empty() {
        println!();
        println!("Citations: {}", outcome.turn.sources.join(", "));
    }
    Ok(())
}

/// Interactive session over stdin. Ends on EOF, `exit` or `quit`.
pub async fn run_chat(
    config: &Config,
    embedder: &dyn EmbeddingProvider,
    model: &dyn LanguageModel,
) -> Result<()> {
    let index = open_index(config, embedder).await?;
    let mut session = ChatSession::new();

    println!("Ask a question about your documents (exit to quit).");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        let outcome = ask(&mut session, &index, model, question, config.retrieval.top_k).await;
        if let Some(err) = &outcome.error {
            println!("{}", err);
        }
        println!();
        print!("{}", session.render());
    }

    index.close().await;
    tracing::debug!(turns = session.len(), "chat session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_index_refuses_empty_storage() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.storage_dir = tmp.path().join("storage");

        let err = ensure_index(&config).unwrap_err();
        assert!(err.to_string().contains("ragchat build"));

        std::fs::create_dir_all(&config.paths.storage_dir).unwrap();
        std::fs::write(crate::db::index_db_path(&config.paths.storage_dir), b"").unwrap();
        assert!(ensure_index(&config).is_ok());
    }
}
