//! Document ingestion: parsing, chunking, and the processing pipeline

pub mod chunker;
pub mod parser;
pub mod processor;

pub use chunker::TextChunker;
pub use parser::{FileParser, ParsedDocument};
pub use processor::IngestPipeline;
