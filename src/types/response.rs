//! Response types for RAG queries and ingestion

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Chunk, Document, FileType};

/// Citation from a source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source filename
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Page number (if applicable)
    pub page_number: Option<u32>,
    /// Section title (if detected)
    pub section_title: Option<String>,
    /// Email subject (for EML sources)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    /// Exact snippet from the source
    pub snippet: String,
    /// Snippet with highlighted query terms (<mark> tags)
    pub snippet_highlighted: String,
    /// Similarity score (0.0-1.0)
    pub similarity_score: f32,
}

/// Longest snippet carried in a citation; full text stays in the chunk
const MAX_SNIPPET_LEN: usize = 400;

impl Citation {
    /// Create a citation from a chunk and similarity score
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        let snippet = truncate_snippet(&chunk.content, MAX_SNIPPET_LEN);
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            filename: chunk.source.filename.clone(),
            file_type: chunk.source.file_type.clone(),
            page_number: chunk.source.page_number,
            section_title: chunk.source.section_title.clone(),
            email_subject: chunk.source.email_subject.clone(),
            snippet_highlighted: snippet.clone(),
            snippet,
            similarity_score,
        }
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        let mut parts = vec![self.filename.clone()];

        if let Some(page) = self.page_number {
            parts.push(format!("Page {}", page));
        }

        if let Some(subject) = &self.email_subject {
            parts.push(format!("Subject: {}", subject));
        }

        format!("[Source: {}]", parts.join(", "))
    }

    /// Highlight query terms in the snippet
    pub fn highlight_terms(&mut self, terms: &[&str]) {
        let mut highlighted = self.snippet.clone();
        for term in terms {
            if term.len() < 3 {
                continue;
            }
            let re = regex::RegexBuilder::new(&regex::escape(term))
                .case_insensitive(true)
                .build();
            if let Ok(re) = re {
                highlighted = re
                    .replace_all(&highlighted, |caps: &regex::Captures| {
                        format!("<mark>{}</mark>", &caps[0])
                    })
                    .to_string();
            }
        }
        self.snippet_highlighted = highlighted;
    }
}

/// Cut text at a word boundary near `max_len`, appending an ellipsis
fn truncate_snippet(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }

    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let cut = match text[..end].rfind(' ') {
        Some(space) if space > max_len / 2 => space,
        _ => end,
    };
    format!("{}...", text[..cut].trim_end())
}

/// Structured decision extracted from the answer
///
/// Mirrors the JSON object the LLM is asked to produce for policy-style
/// queries: decision, payout amount, justification, and cited clauses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionSummary {
    /// "Approved", "Rejected", or "Unknown"
    pub decision: String,
    /// Payout amount if approved (e.g. "$5,000"), "N/A" otherwise
    pub amount: String,
    /// Free-text justification
    pub justification: String,
    /// Clause numbers or section headers supporting the decision
    #[serde(default)]
    pub clauses: Vec<String>,
}

/// Response from a RAG query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer in clear language
    pub answer: String,
    /// Citations with source snippets
    pub citations: Vec<Citation>,
    /// Structured decision summary (if one could be derived)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionSummary>,
    /// Overall confidence score (0.0-1.0)
    pub confidence: f32,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Number of chunks retrieved
    pub chunks_retrieved: usize,
    /// Raw chunks (if include_chunks was true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_chunks: Option<Vec<Chunk>>,
}

impl QueryResponse {
    /// Create a new query response
    pub fn new(answer: String, citations: Vec<Citation>, processing_time_ms: u64) -> Self {
        let confidence = if citations.is_empty() {
            0.0
        } else {
            citations.iter().map(|c| c.similarity_score).sum::<f32>() / citations.len() as f32
        };

        Self {
            answer,
            confidence,
            chunks_retrieved: citations.len(),
            citations,
            decision: None,
            processing_time_ms,
            raw_chunks: None,
        }
    }

    /// Response when no relevant information is found
    pub fn not_found(processing_time_ms: u64) -> Self {
        Self {
            answer: "I couldn't find relevant information in the documents to answer this question."
                .to_string(),
            citations: Vec::new(),
            decision: None,
            confidence: 0.0,
            processing_time_ms,
            chunks_retrieved: 0,
            raw_chunks: None,
        }
    }
}

/// Summary of an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document ID
    pub id: Uuid,
    /// Filename
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Number of chunks created
    pub total_chunks: u32,
    /// Number of pages (if applicable)
    pub total_pages: Option<u32>,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            file_type: doc.file_type.clone(),
            total_chunks: doc.total_chunks,
            total_pages: doc.total_pages,
            file_size: doc.file_size,
            ingested_at: doc.ingested_at,
        }
    }
}

/// Per-file error during ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestError {
    /// Filename that failed
    pub filename: String,
    /// Error message
    pub error: String,
}

/// Response from document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Whether at least one document was ingested
    pub success: bool,
    /// Ingested documents
    pub documents: Vec<DocumentSummary>,
    /// Files skipped by deduplication
    pub skipped: Vec<String>,
    /// Total chunks created across all documents
    pub total_chunks_created: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Per-file errors
    pub errors: Vec<IngestError>,
}

/// Response listing documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    /// All registered documents
    pub documents: Vec<DocumentSummary>,
    /// Total count
    pub total: usize,
    /// Total chunks in the index
    pub total_chunks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkSource, FileType};
    use uuid::Uuid;

    fn chunk(content: &str) -> Chunk {
        Chunk::new(
            Uuid::new_v4(),
            content.to_string(),
            ChunkSource::text("doc.txt".into(), FileType::Txt),
            0,
            content.len(),
            0,
        )
    }

    #[test]
    fn long_snippets_are_truncated_at_word_boundary() {
        let content = "word ".repeat(200);
        let citation = Citation::from_chunk(&chunk(&content), 0.8);
        assert!(citation.snippet.len() <= MAX_SNIPPET_LEN + 3);
        assert!(citation.snippet.ends_with("..."));
        assert!(!citation.snippet.contains("wor..."));
    }

    #[test]
    fn confidence_is_mean_similarity() {
        let citations = vec![
            Citation::from_chunk(&chunk("a chunk"), 0.8),
            Citation::from_chunk(&chunk("b chunk"), 0.4),
        ];
        let response = QueryResponse::new("answer".into(), citations, 10);
        assert!((response.confidence - 0.6).abs() < 1e-6);
        assert_eq!(response.chunks_retrieved, 2);
    }

    #[test]
    fn highlight_wraps_matches_in_mark_tags() {
        let mut citation = Citation::from_chunk(&chunk("Knee surgery is covered"), 0.9);
        citation.highlight_terms(&["knee", "is"]);
        assert!(citation.snippet_highlighted.contains("<mark>Knee</mark>"));
        // Terms shorter than 3 chars are skipped
        assert!(!citation.snippet_highlighted.contains("<mark>is</mark>"));
    }
}
