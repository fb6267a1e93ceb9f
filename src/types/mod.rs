//! Core types for the document Q&A service

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkSource, Document, FileType};
pub use query::{QueryRequest, QueryType};
pub use response::{Citation, DecisionSummary, QueryResponse};
