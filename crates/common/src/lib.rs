//! NewsVerify Common Library
//!
//! Shared code for all NewsVerify crates including:
//! - Corpus data model (document records, evidence items)
//! - Embedding and reasoning capability abstractions
//! - Error types and handling
//! - Configuration management
//! - Logging and metrics

pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod reasoning;

// Re-export commonly used types
pub use config::AppConfig;
pub use corpus::{DocumentRecord, EvidenceItem};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use reasoning::CompletionClient;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Default reasoning model
pub const DEFAULT_REASONING_MODEL: &str = "gemini-2.5-flash";
