//! Query request types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of query for routing between RAG and string search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Full RAG query with semantic search and LLM answer generation
    Question,
    /// Literal string search (word or phrase lookup)
    StringSearch,
}

impl QueryType {
    /// Detect query type from input string
    ///
    /// Heuristics:
    /// - Question if: ends with ?, starts with question words, or 5+ words
    /// - StringSearch otherwise (short phrases, single words)
    pub fn detect(input: &str) -> Self {
        let input = input.trim();

        if input.ends_with('?') {
            return Self::Question;
        }

        let lower = input.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();

        const QUESTION_WORDS: &[&str] = &[
            "what", "how", "why", "when", "where", "who", "which",
            "can", "could", "would", "should", "is", "are", "do", "does",
            "explain", "describe", "tell", "show", "find", "list",
        ];

        if let Some(first_word) = words.first() {
            if QUESTION_WORDS.contains(first_word) {
                return Self::Question;
            }
        }

        if words.len() >= 5 {
            return Self::Question;
        }

        Self::StringSearch
    }
}

/// Query request for RAG search
///
/// `top_k` and `similarity_threshold` fall back to the server's
/// `[retrieval]` configuration when the request leaves them unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Minimum similarity threshold (0.0-1.0)
    #[serde(default)]
    pub similarity_threshold: Option<f32>,

    /// Filter by specific document IDs (optional)
    #[serde(default)]
    pub document_filter: Option<Vec<Uuid>>,

    /// Include raw chunks in response (default: false)
    #[serde(default)]
    pub include_chunks: bool,

    /// Username recorded in the audit log (default: "anonymous")
    #[serde(default)]
    pub username: Option<String>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Filter by document IDs
    pub fn with_documents(mut self, doc_ids: Vec<Uuid>) -> Self {
        self.document_filter = Some(doc_ids);
        self
    }

    /// Resolve retrieval parameters, filling unset fields from configuration
    pub fn retrieval_params(&self, defaults: &crate::config::RetrievalConfig) -> (usize, f32) {
        (
            self.top_k.unwrap_or(defaults.top_k),
            self.similarity_threshold
                .unwrap_or(defaults.similarity_threshold),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_marks_and_question_words_are_questions() {
        assert_eq!(QueryType::detect("What is covered?"), QueryType::Question);
        assert_eq!(QueryType::detect("how do I file a claim"), QueryType::Question);
        assert_eq!(
            QueryType::detect("46-year-old male knee surgery Pune policy"),
            QueryType::Question
        );
    }

    #[test]
    fn short_phrases_are_string_search() {
        assert_eq!(QueryType::detect("knee surgery"), QueryType::StringSearch);
        assert_eq!(QueryType::detect("clause 5.2"), QueryType::StringSearch);
    }

    #[test]
    fn unset_request_fields_stay_unset() {
        let req: QueryRequest = serde_json::from_str(r#"{"question": "What is covered?"}"#).unwrap();
        assert!(req.top_k.is_none());
        assert!(req.similarity_threshold.is_none());
        assert!(req.username.is_none());
        assert!(!req.include_chunks);
    }

    #[test]
    fn retrieval_params_fall_back_to_config() {
        let config = crate::config::RetrievalConfig {
            top_k: 10,
            similarity_threshold: 0.35,
        };

        let (top_k, threshold) = QueryRequest::new("q").retrieval_params(&config);
        assert_eq!(top_k, 10);
        assert!((threshold - 0.35).abs() < 1e-6);

        let (top_k, _) = QueryRequest::new("q").with_top_k(3).retrieval_params(&config);
        assert_eq!(top_k, 3);
    }
}
