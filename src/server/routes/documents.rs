//! Document management endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::response::{DocumentListResponse, DocumentSummary};

/// GET /api/documents - List all registered documents
pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    let mut documents: Vec<DocumentSummary> = state
        .list_documents()
        .iter()
        .map(DocumentSummary::from)
        .collect();
    documents.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));

    Json(DocumentListResponse {
        total: documents.len(),
        total_chunks: state.vector_store().len(),
        documents,
    })
}

/// GET /api/documents/:id - Get document details
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentSummary>> {
    let document = state
        .get_document(&id)
        .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

    Ok(Json(DocumentSummary::from(&document)))
}

/// DELETE /api/documents/:id - Delete a document and its chunks
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if state.get_document(&id).is_none() {
        return Err(Error::DocumentNotFound(id.to_string()));
    }

    let deleted_chunks = state.delete_document_with_chunks(&id)?;
    tracing::info!("Deleted document {} ({} chunks)", id, deleted_chunks);

    Ok(Json(serde_json::json!({
        "deleted": true,
        "document_id": id,
        "chunks_removed": deleted_chunks,
    })))
}
