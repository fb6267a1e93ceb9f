//! docqa-rag: Document Q&A with retrieval-augmented generation
//!
//! Ingests PDF, DOCX, TXT, and EML files, chunks and embeds them, and answers
//! questions over the indexed content with source citations. Embeddings and
//! generation run against the OpenAI API or a local Ollama server, switched
//! with the `EMBEDDING_PROVIDER` env var. Every answered query is appended to
//! a JSONL audit log.

pub mod audit;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, ChunkSource, Document, FileType},
    query::QueryRequest,
    response::{Citation, DecisionSummary, QueryResponse},
};
