//! Vector retrieval over chunk embeddings

pub mod store;

pub use store::{cosine_similarity, SearchHit, VectorStore};
