//! Configuration management for NewsVerify services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable consulted when no reasoning api key is configured
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Corpus artefact locations
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Reasoning model configuration
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Retrieval and prompt limits
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusConfig {
    /// JSON array of document records
    #[serde(default = "default_records_path")]
    pub records_path: PathBuf,

    /// JSON array of embedding vectors, parallel to the records
    #[serde(default = "default_vectors_path")]
    pub vectors_path: PathBuf,

    /// Pre-built index snapshot; rebuilt from the vectors when absent
    pub index_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Batch size for offline embedding
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReasoningConfig {
    /// Reasoning provider: gemini, openai, mock
    #[serde(default = "default_reasoning_provider")]
    pub provider: String,

    /// API key for the reasoning service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_reasoning_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_reasoning_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Evidence items retrieved when the caller gives no k
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Upper bound accepted from callers
    #[serde(default = "default_max_k")]
    pub max_k: usize,

    /// Hard cap on evidence content rendered into the prompt (characters)
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name attached to log lines
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_records_path() -> PathBuf { PathBuf::from("data/articles.json") }
fn default_vectors_path() -> PathBuf { PathBuf::from("data/embeddings.json") }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_batch_size() -> usize { 32 }
fn default_reasoning_provider() -> String { "gemini".to_string() }
fn default_reasoning_model() -> String { crate::DEFAULT_REASONING_MODEL.to_string() }
fn default_reasoning_timeout() -> u64 { 60 }
fn default_k() -> usize { 3 }
fn default_max_k() -> usize { 20 }
fn default_max_content_chars() -> usize { 200 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "newsverify".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__RETRIEVAL__DEFAULT_K=5
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = config.try_deserialize()?;
        config.apply_env_fallbacks();
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = config.try_deserialize()?;
        config.apply_env_fallbacks();
        Ok(config)
    }

    fn apply_env_fallbacks(&mut self) {
        if self.reasoning.api_key.is_none() && self.reasoning.provider == "gemini" {
            self.reasoning.api_key = std::env::var(GEMINI_API_KEY_VAR).ok();
        }
    }

    /// Reject settings that cannot produce a working pipeline
    pub fn validate(&self) -> Result<()> {
        let retrieval = &self.retrieval;
        if retrieval.default_k == 0 || retrieval.max_k == 0 {
            return Err(AppError::Configuration {
                message: "retrieval.default_k and retrieval.max_k must be at least 1".into(),
            });
        }
        if retrieval.default_k > retrieval.max_k {
            return Err(AppError::Configuration {
                message: format!(
                    "retrieval.default_k ({}) exceeds retrieval.max_k ({})",
                    retrieval.default_k, retrieval.max_k
                ),
            });
        }
        if retrieval.max_content_chars == 0 {
            return Err(AppError::Configuration {
                message: "retrieval.max_content_chars must be at least 1".into(),
            });
        }
        if self.server.request_timeout_secs == 0 {
            return Err(AppError::Configuration {
                message: "server.request_timeout_secs must be at least 1".into(),
            });
        }
        if self.embedding.batch_size == 0 {
            return Err(AppError::Configuration {
                message: "embedding.batch_size must be at least 1".into(),
            });
        }
        if self.reasoning.provider != "mock" && self.reasoning.api_key.is_none() {
            return Err(AppError::Configuration {
                message: format!(
                    "reasoning provider '{}' requires an api key (set APP__REASONING__API_KEY or {})",
                    self.reasoning.provider, GEMINI_API_KEY_VAR
                ),
            });
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            records_path: default_records_path(),
            vectors_path: default_vectors_path(),
            index_path: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: default_reasoning_provider(),
            api_key: None,
            api_base: None,
            model: default_reasoning_model(),
            timeout_secs: default_reasoning_timeout(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            max_k: default_max_k(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            corpus: CorpusConfig::default(),
            embedding: EmbeddingConfig::default(),
            reasoning: ReasoningConfig::default(),
            retrieval: RetrievalConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.reasoning.provider = "mock".into();
        config.embedding.provider = "mock".into();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.retrieval.default_k, 3);
        assert_eq!(config.retrieval.max_content_chars, 200);
        assert_eq!(config.reasoning.model, "gemini-2.5-flash");
        assert!(config.corpus.index_path.is_none());
    }

    #[test]
    fn test_validate_accepts_mock_setup() {
        assert!(mock_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_k() {
        let mut config = mock_config();
        config.retrieval.default_k = 0;
        assert!(matches!(
            config.validate(),
            Err(AppError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_default_above_max() {
        let mut config = mock_config();
        config.retrieval.default_k = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_reasoning_key() {
        let mut config = mock_config();
        config.reasoning.provider = "gemini".into();
        config.reasoning.api_key = None;
        assert!(config.validate().is_err());

        config.reasoning.api_key = Some("key".into());
        assert!(config.validate().is_ok());
    }
}
