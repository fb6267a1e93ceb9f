//! Configuration for the document Q&A service
//!
//! Loaded from a TOML file with environment overrides applied afterwards.
//! The active embedding/LLM backend is switched with the `EMBEDDING_PROVIDER`
//! env var (`openai` or `ollama`); `OPENAI_API_KEY` is only ever read from
//! the environment, never from TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Which embedding/LLM backend to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI API (text-embedding-3-small + gpt-4)
    #[default]
    OpenAi,
    /// Local Ollama server (nomic-embed-text + llama3.2)
    Ollama,
}

impl ProviderKind {
    /// Parse from an env-var style string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "open-ai" => Some(Self::OpenAi),
            "ollama" | "local" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Active embedding/LLM provider
    pub provider: ProviderKind,
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// OpenAI provider configuration
    pub openai: OpenAiConfig,
    /// Ollama provider configuration
    pub ollama: OllamaConfig,
    /// Storage configuration
    pub storage: StorageConfig,
    /// Audit log configuration
    pub audit: AuditConfig,
    /// Ingestion processing configuration
    pub processing: ProcessingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 200MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 200 * 1024 * 1024,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size (skip smaller chunks)
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            min_chunk_size: 50,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default number of chunks to retrieve
    pub top_k: usize,
    /// Default minimum similarity (0.0-1.0)
    pub similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.2,
        }
    }
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Embedding dimensions (1536 for text-embedding-3-small)
    pub dimensions: usize,
    /// Chat completion model name
    pub chat_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// API key, populated from OPENAI_API_KEY (never from TOML)
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            embed_model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            chat_model: "gpt-4".to_string(),
            temperature: 0.2,
            timeout_secs: 60,
            max_retries: 2,
            api_key: None,
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            dimensions: 768,
            generate_model: "llama3.2".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the index snapshot and document registry
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docqa-rag");
        Self { data_dir }
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable the JSONL audit log
    pub enabled: bool,
    /// Path to the JSONL audit log file
    pub log_path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: PathBuf::from("logs/audit_log.jsonl"),
        }
    }
}

/// Ingestion processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Timeout for processing a single file in seconds
    pub file_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            file_timeout_secs: 300,
        }
    }
}

impl RagConfig {
    /// Load configuration from a TOML file, then apply env overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Default configuration with env overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// - `EMBEDDING_PROVIDER`: switch between `openai` and `ollama`
    /// - `OPENAI_API_KEY`: credential for the OpenAI backend
    /// - `OLLAMA_BASE_URL`: Ollama server address
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("EMBEDDING_PROVIDER") {
            match ProviderKind::parse(&value) {
                Some(kind) => self.provider = kind,
                None => {
                    tracing::warn!("Ignoring unknown EMBEDDING_PROVIDER value: {:?}", value)
                }
            }
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.openai.api_key = Some(key);
            }
        }

        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            if !url.trim().is_empty() {
                self.ollama.base_url = url;
            }
        }
    }

    /// Embedding dimensions of the active provider
    pub fn dimensions(&self) -> usize {
        match self.provider {
            ProviderKind::OpenAi => self.openai.dimensions,
            ProviderKind::Ollama => self.ollama.dimensions,
        }
    }

    /// Validate that the active provider is usable
    pub fn validate(&self) -> Result<()> {
        if self.provider == ProviderKind::OpenAi && self.openai.api_key.is_none() {
            return Err(Error::Config(
                "OPENAI_API_KEY is not set but the openai provider is selected. \
                 Set the key or switch with EMBEDDING_PROVIDER=ollama"
                    .to_string(),
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(
                "chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_pipeline() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.server.max_upload_size, 200 * 1024 * 1024);
    }

    #[test]
    fn provider_kind_parses_env_values() {
        assert_eq!(ProviderKind::parse("openai"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse("OLLAMA"), Some(ProviderKind::Ollama));
        assert_eq!(ProviderKind::parse("local"), Some(ProviderKind::Ollama));
        assert_eq!(ProviderKind::parse("vertex"), None);
    }

    #[test]
    fn validate_rejects_bad_overlap() {
        let mut config = RagConfig {
            provider: ProviderKind::Ollama,
            ..Default::default()
        };
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_keeps_provider_and_partial_sections() {
        let toml_str = r#"
            provider = "ollama"

            [chunking]
            chunk_size = 800
        "#;
        let config: RagConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider, ProviderKind::Ollama);
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 100);
    }
}
