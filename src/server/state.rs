//! Application state for the document Q&A server

use dashmap::DashMap;
use parking_lot::RwLock;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::AuditLogger;
use crate::config::RagConfig;
use crate::error::Result;
use crate::ingestion::IngestPipeline;
use crate::providers::{build_providers, EmbeddingProvider, LlmProvider};
use crate::retrieval::VectorStore;
use crate::types::Document;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Flat cosine index over chunk embeddings
    vector_store: Arc<VectorStore>,
    /// Embedding provider (OpenAI or Ollama)
    embedding_provider: Arc<dyn EmbeddingProvider>,
    /// LLM provider (OpenAI or Ollama)
    llm_provider: Arc<dyn LlmProvider>,
    /// Parse-and-chunk pipeline
    pipeline: Arc<IngestPipeline>,
    /// JSONL audit log
    audit: Arc<AuditLogger>,
    /// Document registry (persisted to disk)
    documents: DashMap<Uuid, Document>,
    /// Path to documents registry file
    documents_path: PathBuf,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create new application state
    pub async fn new(config: RagConfig) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            "Initializing application state (provider: {:?})...",
            config.provider
        );

        let (embedding_provider, llm_provider) = build_providers(&config)?;
        tracing::info!(
            "Providers initialized ({}: {} dims, model {})",
            embedding_provider.name(),
            embedding_provider.dimensions(),
            llm_provider.model()
        );

        let vector_store = Arc::new(VectorStore::open(
            &config.storage.data_dir,
            embedding_provider.dimensions(),
        )?);
        tracing::info!("Vector store ready ({} chunks)", vector_store.len());

        let pipeline = Arc::new(IngestPipeline::new(&config.chunking));
        let audit = Arc::new(AuditLogger::new(&config.audit)?);

        let documents_path = config.storage.data_dir.join("documents.json");
        let documents = Self::load_documents(&documents_path);
        tracing::info!("Loaded {} documents from registry", documents.len());

        match embedding_provider.health_check().await {
            Ok(true) => tracing::info!("{} provider is reachable", embedding_provider.name()),
            _ => tracing::warn!(
                "{} provider is not reachable; queries will fail until it is",
                embedding_provider.name()
            ),
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                vector_store,
                embedding_provider,
                llm_provider,
                pipeline,
                audit,
                documents,
                documents_path,
                ready: RwLock::new(true),
            }),
        })
    }

    /// Load documents from disk
    fn load_documents(path: &PathBuf) -> DashMap<Uuid, Document> {
        let documents = DashMap::new();

        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<Vec<Document>>(&content) {
                    Ok(docs) => {
                        for doc in docs {
                            documents.insert(doc.id, doc);
                        }
                    }
                    Err(e) => tracing::warn!("Failed to parse documents.json: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read documents.json: {}", e),
            }
        }

        documents
    }

    /// Save documents to disk
    fn save_documents(&self) {
        let docs: Vec<Document> = self
            .inner
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        match serde_json::to_string_pretty(&docs) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.inner.documents_path, content) {
                    tracing::error!("Failed to save documents.json: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize documents: {}", e),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the vector store
    pub fn vector_store(&self) -> &Arc<VectorStore> {
        &self.inner.vector_store
    }

    /// Get the embedding provider
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedding_provider
    }

    /// Get the LLM provider
    pub fn llm_provider(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm_provider
    }

    /// Get the ingest pipeline
    pub fn pipeline(&self) -> &Arc<IngestPipeline> {
        &self.inner.pipeline
    }

    /// Get the audit logger
    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.inner.audit
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }

    /// Add a document to the registry (persisted to disk)
    pub fn add_document(&self, doc: Document) {
        self.inner.documents.insert(doc.id, doc);
        self.save_documents();
    }

    /// Get a document by ID
    pub fn get_document(&self, id: &Uuid) -> Option<Document> {
        self.inner.documents.get(id).map(|d| d.clone())
    }

    /// List all documents
    pub fn list_documents(&self) -> Vec<Document> {
        self.inner
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Find document by filename
    pub fn find_by_filename(&self, filename: &str) -> Option<Document> {
        self.inner
            .documents
            .iter()
            .find(|entry| entry.value().filename == filename)
            .map(|entry| entry.value().clone())
    }

    /// Find document by content hash
    pub fn find_by_hash(&self, content_hash: &str) -> Option<Document> {
        self.inner
            .documents
            .iter()
            .find(|entry| entry.value().content_hash == content_hash)
            .map(|entry| entry.value().clone())
    }

    /// Classify an upload against the registry for deduplication
    pub fn check_file_status(&self, filename: &str, content_hash: &str) -> FileStatus {
        classify_upload(
            filename,
            self.find_by_hash(content_hash),
            self.find_by_filename(filename),
        )
    }

    /// Delete a document and its chunks, returning how many chunks went
    pub fn delete_document_with_chunks(&self, doc_id: &Uuid) -> Result<usize> {
        let deleted = self.inner.vector_store.delete_by_document(*doc_id)?;
        if self.inner.documents.remove(doc_id).is_some() {
            self.save_documents();
        }
        Ok(deleted)
    }
}

/// Status of a file for deduplication
#[derive(Debug, Clone)]
pub enum FileStatus {
    /// File is new, process it
    New,
    /// File exists with same content - skip processing
    Unchanged(Document),
    /// Same content exists under different filename - skip
    Duplicate(Document),
    /// File exists but content changed - delete old and reprocess
    Modified(Document),
}

/// Decide what to do with an upload given registry lookups by hash and name
fn classify_upload(
    filename: &str,
    by_hash: Option<Document>,
    by_name: Option<Document>,
) -> FileStatus {
    if let Some(existing) = by_hash {
        if existing.filename == filename {
            return FileStatus::Unchanged(existing);
        }
        // Same content under a different name, skip it
        return FileStatus::Duplicate(existing);
    }

    if let Some(existing) = by_name {
        return FileStatus::Modified(existing);
    }

    FileStatus::New
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileType;

    fn doc(filename: &str, hash: &str) -> Document {
        Document::new(filename.to_string(), FileType::Txt, hash.to_string(), 42)
    }

    #[test]
    fn upload_classification_covers_all_transitions() {
        let existing = doc("policy.txt", "abc");

        assert!(matches!(
            classify_upload("policy.txt", Some(existing.clone()), Some(existing.clone())),
            FileStatus::Unchanged(_)
        ));
        assert!(matches!(
            classify_upload("renamed.txt", Some(existing.clone()), None),
            FileStatus::Duplicate(_)
        ));
        assert!(matches!(
            classify_upload("policy.txt", None, Some(existing)),
            FileStatus::Modified(_)
        ));
        assert!(matches!(classify_upload("new.txt", None, None), FileStatus::New));
    }
}
