//! Ingestion pipeline: parse -> chunk, producing a document and its chunks

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkSource, Document, FileType};

use super::chunker::TextChunker;
use super::parser::{FileParser, ParsedDocument};

/// Processes uploaded files into documents and chunks
///
/// Embedding is left to the caller so the pipeline stays synchronous and can
/// run under `spawn_blocking`.
pub struct IngestPipeline {
    chunker: TextChunker,
}

impl IngestPipeline {
    /// Create a pipeline from chunking configuration
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunker: TextChunker::new(config),
        }
    }

    /// Parse and chunk a single uploaded file
    pub fn process(&self, filename: &str, data: &[u8]) -> Result<(Document, Vec<Chunk>)> {
        let parsed = FileParser::parse(filename, data)?;

        let mut document = Document::new(
            filename.to_string(),
            parsed.file_type.clone(),
            parsed.content_hash.clone(),
            data.len() as u64,
        );
        document.total_pages = parsed.total_pages;

        for (key, value) in &parsed.metadata {
            document
                .metadata
                .insert(key.clone(), serde_json::Value::String(value.clone()));
        }

        let chunks = self.chunk_parsed(&document, &parsed);

        if chunks.is_empty() {
            return Err(Error::file_parse(
                filename,
                "Document produced no usable text chunks",
            ));
        }

        document.total_chunks = chunks.len() as u32;
        Ok((document, chunks))
    }

    /// Chunk every page of a parsed document with per-format source info
    fn chunk_parsed(&self, document: &Document, parsed: &ParsedDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in &parsed.pages {
            let source = match parsed.file_type {
                FileType::Pdf => ChunkSource::pdf(
                    document.filename.clone(),
                    page.page_number,
                    parsed.total_pages.unwrap_or(1),
                ),
                FileType::Eml => ChunkSource::email(
                    document.filename.clone(),
                    parsed.metadata.get("email_subject").cloned(),
                    parsed.metadata.get("email_from").cloned(),
                ),
                _ => ChunkSource::text(document.filename.clone(), parsed.file_type.clone()),
            };

            let mut page_chunks =
                self.chunker
                    .chunk_text(document.id, &page.content, &source, page.char_offset);
            chunks.append(&mut page_chunks);
        }

        // Re-number across pages so chunk_index is document-wide
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.chunk_index = i as u32;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> IngestPipeline {
        IngestPipeline::new(&ChunkingConfig {
            chunk_size: 200,
            chunk_overlap: 40,
            min_chunk_size: 20,
        })
    }

    #[test]
    fn processes_text_file_end_to_end() {
        let text = "The policy covers knee surgery after a waiting period of ninety days. "
            .repeat(10);
        let (doc, chunks) = pipeline().process("policy.txt", text.as_bytes()).unwrap();

        assert_eq!(doc.filename, "policy.txt");
        assert_eq!(doc.file_type, FileType::Txt);
        assert_eq!(doc.total_chunks as usize, chunks.len());
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.document_id == doc.id));
        assert!(chunks
            .iter()
            .enumerate()
            .all(|(i, c)| c.chunk_index == i as u32));
    }

    #[test]
    fn eml_chunks_carry_subject() {
        let raw = b"Subject: Renewal notice\r\n\
From: insurer@example.com\r\n\
Content-Type: text/plain\r\n\
\r\n\
Your policy is due for renewal next month. Please review the attached terms carefully.\r\n";

        let (doc, chunks) = pipeline().process("renewal.eml", raw).unwrap();
        assert_eq!(doc.file_type, FileType::Eml);
        assert_eq!(
            chunks[0].source.email_subject.as_deref(),
            Some("Renewal notice")
        );
    }

    #[test]
    fn empty_file_is_rejected() {
        let err = pipeline().process("empty.txt", b"   ").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }
}
