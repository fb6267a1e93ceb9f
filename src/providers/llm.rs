//! LLM provider trait for answer generation

use async_trait::async_trait;

use crate::error::Result;

/// Trait for generating text completions
///
/// Prompt construction lives in `generation::PromptBuilder`; providers only
/// run a finished prompt through their model.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for the given prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Model identifier used for generation
    fn model(&self) -> &str;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
