//! Flat in-memory vector store with cosine similarity and JSON persistence

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::Chunk;

/// A search hit: the chunk plus its similarity to the query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity (0.0-1.0 for normalized embeddings)
    pub score: f32,
}

#[derive(Serialize, Deserialize, Default)]
struct Snapshot {
    dimensions: usize,
    chunks: Vec<Chunk>,
}

/// Exhaustive cosine-similarity index over chunk embeddings
///
/// A flat scan is exact and fast enough at the document counts this service
/// handles; the index is snapshotted to `index.json` after every mutation.
pub struct VectorStore {
    entries: RwLock<Vec<Chunk>>,
    dimensions: usize,
    path: PathBuf,
}

impl VectorStore {
    /// Open or create a store at `dir/index.json`
    pub fn open(dir: &Path, dimensions: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("index.json");

        let entries = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            let snapshot: Snapshot = serde_json::from_str(&data)
                .map_err(|e| Error::index(format!("Corrupt index snapshot: {}", e)))?;

            if snapshot.dimensions != 0 && snapshot.dimensions != dimensions {
                // Provider switch changed the embedding space; old vectors
                // are not comparable, start fresh
                tracing::warn!(
                    "Index dimensions changed ({} -> {}), discarding {} chunks",
                    snapshot.dimensions,
                    dimensions,
                    snapshot.chunks.len()
                );
                Vec::new()
            } else {
                tracing::info!("Loaded {} chunks from index snapshot", snapshot.chunks.len());
                snapshot.chunks
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            dimensions,
            path,
        })
    }

    /// In-memory store for tests
    #[cfg(test)]
    pub fn in_memory(dimensions: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            dimensions,
            path: PathBuf::new(),
        }
    }

    /// Number of chunks in the index
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Insert chunks (with embeddings already attached) and persist
    pub fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<()> {
        for chunk in &chunks {
            if chunk.embedding.len() != self.dimensions {
                return Err(Error::index(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimensions,
                    chunk.embedding.len()
                )));
            }
        }

        {
            let mut entries = self.entries.write();
            entries.extend(chunks);
        }
        self.persist()
    }

    /// Find the `top_k` most similar chunks above `threshold`
    ///
    /// When `document_filter` is set, only chunks from those documents are
    /// considered.
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f32,
        document_filter: Option<&[Uuid]>,
    ) -> Result<Vec<SearchHit>> {
        if query_embedding.len() != self.dimensions {
            return Err(Error::index(format!(
                "Query dimension mismatch: expected {}, got {}",
                self.dimensions,
                query_embedding.len()
            )));
        }

        let entries = self.entries.read();

        let mut hits: Vec<SearchHit> = entries
            .iter()
            .filter(|chunk| match document_filter {
                Some(ids) => ids.contains(&chunk.document_id),
                None => true,
            })
            .map(|chunk| SearchHit {
                score: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .filter(|hit| hit.score >= threshold)
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);

        Ok(hits)
    }

    /// Literal substring search over chunk text (case-insensitive)
    pub fn string_search(
        &self,
        needle: &str,
        top_k: usize,
        document_filter: Option<&[Uuid]>,
    ) -> Vec<SearchHit> {
        let needle = needle.to_lowercase();
        let entries = self.entries.read();

        entries
            .iter()
            .filter(|chunk| match document_filter {
                Some(ids) => ids.contains(&chunk.document_id),
                None => true,
            })
            .filter(|chunk| chunk.content.to_lowercase().contains(&needle))
            .take(top_k)
            .map(|chunk| SearchHit {
                chunk: chunk.clone(),
                score: 1.0,
            })
            .collect()
    }

    /// Remove all chunks belonging to a document, returning how many
    pub fn delete_by_document(&self, document_id: Uuid) -> Result<usize> {
        let removed = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|chunk| chunk.document_id != document_id);
            before - entries.len()
        };

        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Write the snapshot to disk
    fn persist(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }

        let snapshot = {
            let entries = self.entries.read();
            Snapshot {
                dimensions: self.dimensions,
                chunks: entries.clone(),
            }
        };

        let json = serde_json::to_string(&snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkSource, FileType};

    fn chunk_with(doc_id: Uuid, content: &str, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(
            doc_id,
            content.to_string(),
            ChunkSource::text("test.txt".into(), FileType::Txt),
            0,
            content.len(),
            0,
        );
        chunk.embedding = embedding;
        chunk
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn search_ranks_by_similarity() {
        let store = VectorStore::in_memory(2);
        let doc = Uuid::new_v4();
        store
            .insert_chunks(vec![
                chunk_with(doc, "exact match", vec![1.0, 0.0]),
                chunk_with(doc, "orthogonal", vec![0.0, 1.0]),
                chunk_with(doc, "close match", vec![0.9, 0.1]),
            ])
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 2, 0.2, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.content, "exact match");
        assert_eq!(hits[1].chunk.content, "close match");
    }

    #[test]
    fn threshold_filters_weak_hits() {
        let store = VectorStore::in_memory(2);
        let doc = Uuid::new_v4();
        store
            .insert_chunks(vec![chunk_with(doc, "weak", vec![0.1, 0.99])])
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 5, 0.5, None).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn document_filter_restricts_results() {
        let store = VectorStore::in_memory(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store
            .insert_chunks(vec![
                chunk_with(a, "from a", vec![1.0, 0.0]),
                chunk_with(b, "from b", vec![1.0, 0.0]),
            ])
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 5, 0.0, Some(&[a])).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.content, "from a");
    }

    #[test]
    fn delete_by_document_removes_chunks() {
        let store = VectorStore::in_memory(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store
            .insert_chunks(vec![
                chunk_with(a, "from a", vec![1.0, 0.0]),
                chunk_with(b, "from b", vec![0.0, 1.0]),
            ])
            .unwrap();

        assert_eq!(store.delete_by_document(a).unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let store = VectorStore::in_memory(3);
        let doc = Uuid::new_v4();
        let err = store
            .insert_chunks(vec![chunk_with(doc, "bad", vec![1.0, 0.0])])
            .unwrap_err();
        assert!(matches!(err, Error::Index(_)));

        assert!(store.search(&[1.0], 5, 0.0, None).is_err());
    }

    #[test]
    fn string_search_is_case_insensitive() {
        let store = VectorStore::in_memory(2);
        let doc = Uuid::new_v4();
        store
            .insert_chunks(vec![chunk_with(doc, "Knee Surgery clause", vec![1.0, 0.0])])
            .unwrap();

        let hits = store.string_search("knee surgery", 5, None);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Uuid::new_v4();
        {
            let store = VectorStore::open(dir.path(), 2).unwrap();
            store
                .insert_chunks(vec![chunk_with(doc, "persisted", vec![1.0, 0.0])])
                .unwrap();
        }

        let reopened = VectorStore::open(dir.path(), 2).unwrap();
        assert_eq!(reopened.len(), 1);

        // Different dimensions discard the old snapshot
        let fresh = VectorStore::open(dir.path(), 4).unwrap();
        assert_eq!(fresh.len(), 0);
    }
}
