//! # ragchat
//!
//! Retrieval-augmented chat over uploaded PDF documents, with citations.
//!
//! PDFs are split into sentence-sized chunks addressed by
//! `(file_name, page_num, chunk_num)`. The chunks are embedded into a
//! persistent vector index. Questions retrieve the closest chunk, a language
//! model answers from it, and every answer carries the address it came from.
//! An answer that cannot be cited is replaced by `No answer found.`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌───────────────┐
//! │  docs/   │──▶│  Extractor  │──▶│ Index builder │
//! │  *.pdf   │   │ page → unit │   │ embed + store │
//! └──────────┘   └──────┬──────┘   └───────┬───────┘
//!                       ▼                  ▼
//!              parsed_chunks.json     storage/ (SQLite)
//!                                          │
//!                                          ▼
//!                                 ┌─────────────────┐
//!                                 │ Query + citation│──▶ chat history
//!                                 └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragchat upload report.pdf     # copy into docs/ and extract chunks
//! ragchat build                 # embed and persist the index
//! ragchat ask "What did the cat do?"
//! ragchat chat                  # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Per-page PDF text extraction |
//! | [`chunk`] | Sentence splitting and folder extraction |
//! | [`artifact`] | Chunk artifact (JSON) and preview |
//! | [`upload`] | Upload and extract commands |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`db`] | Index database connection |
//! | [`migrate`] | Index schema |
//! | [`index`] | Vector index build, load and query |
//! | [`progress`] | Build progress reporting |
//! | [`llm`] | Language model backends |
//! | [`citation`] | Citation formatting and the answer validity rule |
//! | [`session`] | Chat history |
//! | [`query`] | Retrieve, generate, cite |
//! | [`status`] | Pipeline status overview |
//! | [`build_cmd`] | `ragchat build` |
//! | [`chat_cmd`] | `ragchat ask` and `ragchat chat` |

pub mod artifact;
pub mod build_cmd;
pub mod chat_cmd;
pub mod chunk;
pub mod citation;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod query;
pub mod session;
pub mod status;
pub mod upload;
