//! API routes for the document Q&A server

pub mod documents;
pub mod ingest;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Document management
        .route("/documents", get(documents::list_documents))
        .route("/documents/:id", get(documents::get_document))
        .route("/documents/:id", delete(documents::delete_document))
        // Ingestion - with larger body limit for file uploads
        .route(
            "/ingest",
            post(ingest::ingest_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Query
        .route("/query", post(query::query_rag))
        // String search
        .route("/string-search", post(query::string_search))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document Q&A with retrieval-augmented generation and citations",
        "endpoints": {
            "POST /api/ingest": "Upload and process documents (PDF, DOCX, TXT, EML)",
            "POST /api/query": "Ask a question, get a grounded answer with citations",
            "POST /api/string-search": "Literal string search over chunks",
            "GET /api/documents": "List all documents",
            "GET /api/documents/:id": "Get document details",
            "DELETE /api/documents/:id": "Delete a document and its chunks",
        },
    }))
}
