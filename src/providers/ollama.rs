//! Ollama client for local embeddings and generation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::OllamaConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Ollama API client with automatic retry
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaProvider {
    /// Create a provider from Ollama configuration
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Ollama request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.config.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.config.base_url);

        self.retry_request(|| {
            let url = url.clone();

            async move {
                let request = EmbedRequest {
                    model: &self.config.embed_model,
                    prompt: text,
                };

                let response = self
                    .client
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(Error::embedding(format!(
                        "Embedding failed: HTTP {}",
                        response.status()
                    )));
                }

                let parsed: EmbedResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse embedding response: {}", e))
                })?;

                Ok(parsed.embedding)
            }
        })
        .await
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.config.base_url);

        self.retry_request(|| {
            let url = url.clone();

            async move {
                let request = GenerateRequest {
                    model: &self.config.generate_model,
                    prompt,
                    stream: false,
                    options: GenerateOptions {
                        temperature: self.config.temperature,
                    },
                };

                let response = self
                    .client
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Generation request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(Error::llm(format!(
                        "Generation failed: HTTP {}",
                        response.status()
                    )));
                }

                let parsed: GenerateResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::llm(format!("Failed to parse generation response: {}", e)))?;

                Ok(parsed.response)
            }
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        EmbeddingProvider::health_check(self).await
    }

    fn model(&self) -> &str {
        &self.config.generate_model
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
