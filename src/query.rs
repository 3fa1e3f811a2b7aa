//! Question answering: retrieve, generate, cite, record.
//!
//! One question runs to completion before the next is accepted. The
//! retrieve-and-generate step is the only place in the pipeline where
//! failures are caught: a failing index query or model call becomes a
//! user-visible message and a [`NO_ANSWER`](crate::citation::NO_ANSWER)
//! turn, and the session carries on.

use anyhow::Result;

use crate::citation::{collect_citations, finalize_answer};
use crate::index::VectorIndex;
use crate::llm::LanguageModel;
use crate::models::{ChatTurn, RetrievedChunk};
use crate::session::ChatSession;

/// Result of one question.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    /// The turn as recorded in the session.
    pub turn: ChatTurn,
    /// Chunks the answer was grounded on; empty when retrieval failed.
    pub retrieved: Vec<RetrievedChunk>,
    /// Message to show when retrieval or generation failed.
    pub error: Option<String>,
}

/// Join retrieved chunk texts into the context handed to the model.
pub fn build_context(retrieved: &[RetrievedChunk]) -> String {
    retrieved
        .iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

async fn retrieve_and_generate(
    index: &dyn VectorIndex,
    model: &dyn LanguageModel,
    question: &str,
    top_k: usize,
) -> Result<(Vec<RetrievedChunk>, Option<String>)> {
    let retrieved = index.query(question, top_k).await?;
    if retrieved.is_empty() {
        tracing::debug!("no chunks retrieved, skipping generation");
        return Ok((retrieved, None));
    }

    let context = build_context(&retrieved);
    let answer = model.generate(&context, question).await?;
    Ok((retrieved, Some(answer)))
}

/// Answer `question` without touching any session.
pub async fn answer_question(
    index: &dyn VectorIndex,
    model: &dyn LanguageModel,
    question: &str,
    top_k: usize,
) -> AskOutcome {
    let (retrieved, answer, error) =
        match retrieve_and_generate(index, model, question, top_k).await {
            Ok((retrieved, answer)) => (retrieved, answer, None),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "answer generation failed");
                (
                    Vec::new(),
                    None,
                    Some(format!("Error running language model: {:#}", e)),
                )
            }
        };

    let sources = collect_citations(&retrieved);
    let (answer, sources) = finalize_answer(answer, sources);

    AskOutcome {
        turn: ChatTurn {
            question: question.to_string(),
            answer,
            sources,
        },
        retrieved,
        error,
    }
}

/// Answer `question` and append the turn to `session`, whatever the outcome.
pub async fn ask(
    session: &mut ChatSession,
    index: &dyn VectorIndex,
    model: &dyn LanguageModel,
    question: &str,
    top_k: usize,
) -> AskOutcome {
    let outcome = answer_question(index, model, question, top_k).await;
    session.record(outcome.turn.clone());
    outcome
}
