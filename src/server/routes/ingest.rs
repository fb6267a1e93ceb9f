//! Document ingestion endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::{AppState, FileStatus};
use crate::types::{
    response::{DocumentSummary, IngestError, IngestResponse},
    Document,
};

/// POST /api/ingest - Upload and process files
pub async fn ingest_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();
    let mut documents = Vec::new();
    let mut skipped = Vec::new();
    let mut errors = Vec::new();
    let mut total_chunks = 0u32;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::internal(format!("Failed to read multipart field: {}", e)))?
    {
        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("file_{}.bin", Uuid::new_v4()));

        let data = match field.bytes().await {
            Ok(d) => d,
            Err(e) => {
                errors.push(IngestError {
                    filename: filename.clone(),
                    error: format!("Failed to read file: {}", e),
                });
                continue;
            }
        };

        tracing::info!("Processing file: {} ({} bytes)", filename, data.len());

        let file_timeout = Duration::from_secs(state.config().processing.file_timeout_secs);
        let file_start = Instant::now();

        let process_result = timeout(
            file_timeout,
            process_file_with_dedup(&state, &filename, data.to_vec()),
        )
        .await;

        match process_result {
            Ok(Ok(ProcessResult::New(doc, chunk_count))) => {
                total_chunks += chunk_count;
                documents.push(DocumentSummary::from(&doc));
                state.add_document(doc);
                tracing::info!(
                    "Ingested new file: {} in {:.1}s",
                    filename,
                    file_start.elapsed().as_secs_f64()
                );
            }
            Ok(Ok(ProcessResult::Updated(doc, chunk_count, old_chunks_deleted))) => {
                total_chunks += chunk_count;
                documents.push(DocumentSummary::from(&doc));
                state.add_document(doc);
                tracing::info!(
                    "Updated file: {} (deleted {} old chunks, created {} new) in {:.1}s",
                    filename,
                    old_chunks_deleted,
                    chunk_count,
                    file_start.elapsed().as_secs_f64()
                );
            }
            Ok(Ok(ProcessResult::Skipped(reason))) => {
                tracing::info!("Skipped file: {} ({})", filename, reason);
                skipped.push(filename);
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to process {}: {}", filename, e);
                errors.push(IngestError {
                    filename,
                    error: e.to_string(),
                });
            }
            Err(_) => {
                tracing::error!(
                    "Processing timed out after {}s for {}",
                    file_timeout.as_secs(),
                    filename
                );
                errors.push(IngestError {
                    filename,
                    error: format!("Processing timed out after {}s", file_timeout.as_secs()),
                });
            }
        }
    }

    let response = IngestResponse {
        success: !documents.is_empty(),
        documents,
        skipped,
        total_chunks_created: total_chunks,
        processing_time_ms: start.elapsed().as_millis() as u64,
        errors,
    };

    Ok(Json(response))
}

enum ProcessResult {
    /// New document ingested
    New(Document, u32),
    /// Existing document replaced (doc, new chunks, old chunks deleted)
    Updated(Document, u32, usize),
    /// Skipped by deduplication
    Skipped(String),
}

/// Parse, deduplicate, embed, and index one uploaded file
async fn process_file_with_dedup(
    state: &AppState,
    filename: &str,
    data: Vec<u8>,
) -> Result<ProcessResult> {
    // Parsing and chunking are CPU-bound, keep them off the async runtime
    let pipeline = state.pipeline().clone();
    let owned_filename = filename.to_string();
    let (document, mut chunks) =
        tokio::task::spawn_blocking(move || pipeline.process(&owned_filename, &data))
            .await
            .map_err(|e| Error::internal(format!("Processing task failed: {}", e)))??;

    let mut old_chunks_deleted = None;
    match state.check_file_status(filename, &document.content_hash) {
        FileStatus::Unchanged(_) => {
            return Ok(ProcessResult::Skipped("unchanged content".to_string()));
        }
        FileStatus::Duplicate(existing) => {
            return Ok(ProcessResult::Skipped(format!(
                "duplicate of {}",
                existing.filename
            )));
        }
        FileStatus::Modified(existing) => {
            let deleted = state.delete_document_with_chunks(&existing.id)?;
            old_chunks_deleted = Some(deleted);
        }
        FileStatus::New => {}
    }

    // Embed all chunks in one batch
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = state.embedding_provider().embed_batch(&texts).await?;

    if embeddings.len() != chunks.len() {
        return Err(Error::embedding(format!(
            "Expected {} embeddings, got {}",
            chunks.len(),
            embeddings.len()
        )));
    }

    for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
        chunk.embedding = embedding;
    }

    let chunk_count = chunks.len() as u32;
    let store = state.vector_store().clone();
    tokio::task::spawn_blocking(move || store.insert_chunks(chunks))
        .await
        .map_err(|e| Error::internal(format!("Index task failed: {}", e)))??;

    match old_chunks_deleted {
        Some(deleted) => Ok(ProcessResult::Updated(document, chunk_count, deleted)),
        None => Ok(ProcessResult::New(document, chunk_count)),
    }
}
