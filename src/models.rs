//! Core data models that flow through extraction, indexing and answering.

use serde::{Deserialize, Serialize};

/// A sentence-like text unit from one page of one document.
///
/// `(file_name, page_num, chunk_num)` is unique within one extraction run.
/// `page_num` and `chunk_num` are 1-based; `chunk_num` restarts on each page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub file_name: String,
    pub page_num: u32,
    pub chunk_num: u32,
    pub text: String,
}

/// Metadata attached to every indexed document and returned with every hit.
///
/// Fields are optional because an index may hold documents written by other
/// tools; citation formatting degrades based on what is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_name: Option<String>,
    pub page_num: Option<u32>,
    pub chunk_num: Option<u32>,
}

/// The embeddable form of a [`Chunk`]: its text plus its address.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl From<&Chunk> for IndexedDocument {
    fn from(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            metadata: ChunkMetadata {
                file_name: Some(chunk.file_name.clone()),
                page_num: Some(chunk.page_num),
                chunk_num: Some(chunk.chunk_num),
            },
        }
    }
}

/// A ranked hit from the vector index.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// One question/answer exchange in a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
}
