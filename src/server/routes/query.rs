//! Query endpoints: RAG with citations, plus literal string search

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::audit::AuditEntry;
use crate::error::Result;
use crate::generation::{extract_and_link_citations, extract_decision_summary, PromptBuilder};
use crate::retrieval::SearchHit;
use crate::server::state::AppState;
use crate::types::{
    query::{QueryRequest, QueryType},
    response::{Citation, QueryResponse},
};

/// POST /api/query - Ask a question over the ingested documents
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();

    tracing::info!("Query: \"{}\"", request.question);

    let (top_k, threshold) = request.retrieval_params(&state.config().retrieval);

    // Short phrases get literal matching instead of the full RAG path
    let query_type = QueryType::detect(&request.question);
    if matches!(query_type, QueryType::StringSearch) {
        let response = string_search_response(&state, &request, top_k, start);
        record_audit(&state, &request, &response);
        return Ok(Json(response));
    }

    let query_embedding = state.embedding_provider().embed(&request.question).await?;

    let store = state.vector_store().clone();
    let filter = request.document_filter.clone();
    let limit = fetch_limit(top_k);
    let mut hits: Vec<SearchHit> = tokio::task::spawn_blocking(move || {
        store.search(&query_embedding, limit, threshold, filter.as_deref())
    })
    .await
    .map_err(|e| crate::error::Error::internal(format!("Search task failed: {}", e)))??;

    hits.truncate(top_k);

    if hits.is_empty() {
        let response = QueryResponse::not_found(start.elapsed().as_millis() as u64);
        record_audit(&state, &request, &response);
        return Ok(Json(response));
    }

    let terms: Vec<&str> = request.question.split_whitespace().collect();
    let mut citations: Vec<Citation> = hits
        .iter()
        .map(|hit| {
            let mut citation = Citation::from_chunk(&hit.chunk, hit.score);
            citation.highlight_terms(&terms);
            citation
        })
        .collect();

    let context = PromptBuilder::build_context(&hits);

    // Claim-style queries get the structured decision prompt
    let prompt = if is_decision_query(&request.question) {
        PromptBuilder::build_decision_prompt(&request.question, &context)
    } else {
        PromptBuilder::build_rag_prompt(&request.question, &context, &citations)
    };

    let answer = state.llm_provider().generate(&prompt).await?;

    let decision = extract_decision_summary(&answer);
    let (clean_answer, linked_citations) = extract_and_link_citations(&answer, &mut citations);

    let processing_time_ms = start.elapsed().as_millis() as u64;
    let mut response = QueryResponse::new(clean_answer, linked_citations, processing_time_ms);
    response.chunks_retrieved = hits.len();
    response.decision = decision;

    if request.include_chunks {
        response.raw_chunks = Some(hits.into_iter().map(|h| h.chunk).collect());
    }

    record_audit(&state, &request, &response);

    Ok(Json(response))
}

/// Over-fetch factor so threshold filtering still leaves top_k results
fn fetch_limit(top_k: usize) -> usize {
    top_k.saturating_mul(2)
}

/// Literal string search response for short queries routed through /api/query
fn string_search_response(
    state: &AppState,
    request: &QueryRequest,
    top_k: usize,
    start: Instant,
) -> QueryResponse {
    let hits = state.vector_store().string_search(
        &request.question,
        top_k,
        request.document_filter.as_deref(),
    );

    if hits.is_empty() {
        return QueryResponse::not_found(start.elapsed().as_millis() as u64);
    }

    let terms: Vec<&str> = request.question.split_whitespace().collect();
    let citations: Vec<Citation> = hits
        .iter()
        .map(|hit| {
            let mut citation = Citation::from_chunk(&hit.chunk, hit.score);
            citation.highlight_terms(&terms);
            citation
        })
        .collect();

    let answer = format!(
        "Found {} passage(s) containing \"{}\":\n{}",
        citations.len(),
        request.question,
        citations
            .iter()
            .map(|c| format!("- {}", c.format_inline()))
            .collect::<Vec<_>>()
            .join("\n")
    );

    QueryResponse::new(answer, citations, start.elapsed().as_millis() as u64)
}

/// Whether the question asks for a claim/coverage decision
fn is_decision_query(question: &str) -> bool {
    const DECISION_TERMS: &[&str] = &[
        "claim", "approve", "approved", "reject", "rejected", "covered", "coverage",
        "eligible", "eligibility", "payout", "reimburse", "reimbursement",
    ];

    let lower = question.to_lowercase();
    DECISION_TERMS.iter().any(|term| lower.contains(term))
}

fn record_audit(state: &AppState, request: &QueryRequest, response: &QueryResponse) {
    let entry = AuditEntry::from_response(
        request.username.as_deref(),
        &request.question,
        response,
    );
    state.audit().record(&entry);
}

/// Request body for POST /api/string-search
#[derive(Debug, Deserialize)]
pub struct StringSearchRequest {
    /// Text to search for literally
    pub query: String,
    /// Maximum matches to return
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Response for POST /api/string-search
#[derive(Debug, Serialize)]
pub struct StringSearchResponse {
    /// The search text
    pub query: String,
    /// Matching passages
    pub matches: Vec<Citation>,
    /// Total matches returned
    pub total_matches: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// POST /api/string-search - Literal substring search over chunks
pub async fn string_search(
    State(state): State<AppState>,
    Json(request): Json<StringSearchRequest>,
) -> Result<Json<StringSearchResponse>> {
    let start = Instant::now();

    let hits = state
        .vector_store()
        .string_search(&request.query, request.limit, None);

    let terms: Vec<&str> = request.query.split_whitespace().collect();
    let matches: Vec<Citation> = hits
        .iter()
        .map(|hit| {
            let mut citation = Citation::from_chunk(&hit.chunk, hit.score);
            citation.highlight_terms(&terms);
            citation
        })
        .collect();

    Ok(Json(StringSearchResponse {
        query: request.query,
        total_matches: matches.len(),
        matches,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_queries_are_detected() {
        assert!(is_decision_query("Is knee surgery covered for a 46-year-old?"));
        assert!(is_decision_query("Will my claim be approved?"));
        assert!(!is_decision_query("What is the waiting period?"));
    }

    #[test]
    fn fetch_limit_never_overflows() {
        assert_eq!(fetch_limit(5), 10);
        assert_eq!(fetch_limit(usize::MAX), usize::MAX);
        assert_eq!(fetch_limit(usize::MAX / 2 + 1), usize::MAX);
    }
}
