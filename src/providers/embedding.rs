//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OpenAiProvider`: OpenAI API (text-embedding-3-small)
/// - `OllamaProvider`: Local Ollama server (nomic-embed-text)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    ///
    /// Default implementation calls `embed` sequentially; implementations
    /// with a batch endpoint should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get embedding dimensions (1536 for text-embedding-3-small, 768 for nomic-embed-text)
    fn dimensions(&self) -> usize;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn default_batch_preserves_order() {
        let embedder = FixedEmbedder;
        let texts = vec!["a".to_string(), "abc".to_string()];
        let embeddings = tokio_test::block_on(embedder.embed_batch(&texts)).unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 1.0], vec![3.0, 1.0]]);
    }
}
