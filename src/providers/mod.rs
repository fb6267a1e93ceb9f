//! Provider abstractions for embeddings and LLM generation
//!
//! Trait-based seams allow switching between the OpenAI API and a local
//! Ollama server with the `EMBEDDING_PROVIDER` env var.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod openai;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use std::sync::Arc;

use crate::config::{ProviderKind, RagConfig};
use crate::error::Result;

/// Build the embedding and LLM providers selected in the configuration
pub fn build_providers(
    config: &RagConfig,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn LlmProvider>)> {
    match config.provider {
        ProviderKind::OpenAi => {
            let provider = Arc::new(OpenAiProvider::new(&config.openai)?);
            Ok((
                provider.clone() as Arc<dyn EmbeddingProvider>,
                provider as Arc<dyn LlmProvider>,
            ))
        }
        ProviderKind::Ollama => {
            let provider = Arc::new(OllamaProvider::new(&config.ollama)?);
            Ok((
                provider.clone() as Arc<dyn EmbeddingProvider>,
                provider as Arc<dyn LlmProvider>,
            ))
        }
    }
}
