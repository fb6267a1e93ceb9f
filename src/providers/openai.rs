//! OpenAI API client implementing both provider traits

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::OpenAiConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// OpenAI API client with automatic retry
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl OpenAiProvider {
    /// Create a provider; fails when no API key is configured
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
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
                            "OpenAI request failed (attempt {}/{}), retrying in {:?}",
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

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.config.base_url);

        self.retry_request(|| {
            let url = url.clone();

            async move {
                let request = EmbeddingRequest {
                    model: &self.config.embed_model,
                    input: texts.iter().map(String::as_str).collect(),
                };

                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::embedding(format!(
                        "Embedding failed: HTTP {}: {}",
                        status, body
                    )));
                }

                let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse embedding response: {}", e))
                })?;

                if parsed.data.len() != texts.len() {
                    return Err(Error::embedding(format!(
                        "Expected {} embeddings, got {}",
                        texts.len(),
                        parsed.data.len()
                    )));
                }

                // Responses carry an index field; restore request order
                let mut data = parsed.data;
                data.sort_by_key(|d| d.index);
                Ok(data.into_iter().map(|d| d.embedding).collect())
            }
        })
        .await
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let embeddings = self.embed_texts(&texts).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Keep request bodies bounded; the API accepts large batches but
        // chunk uploads can run to thousands of texts
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(100) {
            all.extend(self.embed_texts(batch).await?);
        }
        Ok(all)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/v1/models", self.config.base_url);
        match self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        self.retry_request(|| {
            let url = url.clone();

            async move {
                let request = ChatRequest {
                    model: &self.config.chat_model,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                    temperature: self.config.temperature,
                };

                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Chat request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::llm(format!(
                        "Chat completion failed: HTTP {}: {}",
                        status, body
                    )));
                }

                let parsed: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::llm(format!("Failed to parse chat response: {}", e)))?;

                parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .ok_or_else(|| Error::llm("Chat response contained no choices"))
            }
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        EmbeddingProvider::health_check(self).await
    }

    fn model(&self) -> &str {
        &self.config.chat_model
    }

    fn name(&self) -> &str {
        "openai"
    }
}
