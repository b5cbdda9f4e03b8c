//! Error types for NewsVerify services
//!
//! Provides a single error taxonomy with:
//! - Distinct variants for bad input, corpus integrity, upstream and parse failures
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// External capability that produced a failure
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Text embedding model
    Embedding,
    /// Hosted reasoning model
    Reasoning,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Embedding => write!(f, "embedding"),
            Capability::Reasoning => write!(f, "reasoning"),
        }
    }
}

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors (1xxx)
    InvalidQuery,
    ValidationError,

    // Corpus integrity errors (4xxx)
    CorpusMismatch,
    DimensionMismatch,
    DegenerateVector,
    EmptyIndex,
    SnapshotCorrupt,

    // External capability errors (8xxx)
    UpstreamError,
    UpstreamTimeout,
    VerdictParseError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    IoError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidQuery => 1001,
            ErrorCode::ValidationError => 1002,

            ErrorCode::CorpusMismatch => 4001,
            ErrorCode::DimensionMismatch => 4002,
            ErrorCode::DegenerateVector => 4003,
            ErrorCode::EmptyIndex => 4004,
            ErrorCode::SnapshotCorrupt => 4005,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::UpstreamTimeout => 8002,
            ErrorCode::VerdictParseError => 8003,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::IoError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Input errors
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Corpus and index integrity errors
    #[error("Corpus mismatch: {records} records but {vectors} vectors")]
    CorpusMismatch { records: usize, vectors: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Degenerate vector at position {position}: norm is zero or not finite")]
    DegenerateVector { position: usize },

    #[error("Similarity index is empty")]
    EmptyIndex,

    #[error("Index snapshot corrupt: {message}")]
    SnapshotCorrupt { message: String },

    // External capability errors
    #[error("{capability} capability failed: {message}")]
    ExternalCapability {
        capability: Capability,
        message: String,
    },

    #[error("{capability} capability timed out after {timeout_ms}ms")]
    CapabilityTimeout {
        capability: Capability,
        timeout_ms: u64,
    },

    #[error("Could not parse verdict: {message}")]
    VerdictParse { message: String, raw: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidQuery { .. } => ErrorCode::InvalidQuery,
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::CorpusMismatch { .. } => ErrorCode::CorpusMismatch,
            AppError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            AppError::DegenerateVector { .. } => ErrorCode::DegenerateVector,
            AppError::EmptyIndex => ErrorCode::EmptyIndex,
            AppError::SnapshotCorrupt { .. } => ErrorCode::SnapshotCorrupt,
            AppError::ExternalCapability { .. } => ErrorCode::UpstreamError,
            AppError::CapabilityTimeout { .. } => ErrorCode::UpstreamTimeout,
            AppError::VerdictParse { .. } => ErrorCode::VerdictParseError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Io(_) => ErrorCode::IoError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::InvalidQuery { .. } | AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            AppError::CorpusMismatch { .. }
            | AppError::DimensionMismatch { .. }
            | AppError::DegenerateVector { .. }
            | AppError::EmptyIndex
            | AppError::SnapshotCorrupt { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::ExternalCapability { .. } | AppError::VerdictParse { .. } => {
                StatusCode::BAD_GATEWAY
            }

            // 504 Gateway Timeout
            AppError::CapabilityTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Corpus or index integrity failure; these abort startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::CorpusMismatch { .. }
                | AppError::DimensionMismatch { .. }
                | AppError::DegenerateVector { .. }
                | AppError::EmptyIndex
                | AppError::SnapshotCorrupt { .. }
        )
    }

    /// Whether a caller may reasonably retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ExternalCapability { .. } | AppError::CapabilityTimeout { .. }
        )
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Shorthand for an upstream failure of the embedding capability
    pub fn embedding(message: impl Into<String>) -> Self {
        AppError::ExternalCapability {
            capability: Capability::Embedding,
            message: message.into(),
        }
    }

    /// Shorthand for an upstream failure of the reasoning capability
    pub fn reasoning(message: impl Into<String>) -> Self {
        AppError::ExternalCapability {
            capability: Capability::Reasoning,
            message: message.into(),
        }
    }

    /// Map a reqwest failure, keeping timeouts distinct from other upstream errors
    pub fn from_http(capability: Capability, err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            AppError::CapabilityTimeout {
                capability,
                timeout_ms,
            }
        } else {
            AppError::ExternalCapability {
                capability,
                message: format!("Request failed: {}", err),
            }
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let details = match &self {
            AppError::VerdictParse { raw, .. } => {
                Some(serde_json::json!({ "raw_response": raw }))
            }
            AppError::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                retryable: self.is_retryable(),
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::InvalidQuery {
            message: "empty claim".into(),
        };
        assert_eq!(err.code(), ErrorCode::InvalidQuery);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_integrity_errors_are_fatal() {
        assert!(AppError::EmptyIndex.is_fatal());
        assert!(AppError::CorpusMismatch {
            records: 3,
            vectors: 2
        }
        .is_fatal());
        assert!(AppError::DegenerateVector { position: 0 }.is_fatal());
        assert!(!AppError::reasoning("boom").is_fatal());
    }

    #[test]
    fn test_timeout_distinct_from_upstream_error() {
        let timeout = AppError::CapabilityTimeout {
            capability: Capability::Embedding,
            timeout_ms: 5000,
        };
        let failure = AppError::embedding("503 Service Unavailable");

        assert_eq!(timeout.code(), ErrorCode::UpstreamTimeout);
        assert_eq!(failure.code(), ErrorCode::UpstreamError);
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(timeout.is_retryable());
        assert!(failure.is_retryable());
        assert_eq!(
            timeout.to_string(),
            "embedding capability timed out after 5000ms"
        );
    }

    #[test]
    fn test_verdict_parse_keeps_raw_text() {
        let err = AppError::VerdictParse {
            message: "expected value".into(),
            raw: "not json at all".into(),
        };
        match &err {
            AppError::VerdictParse { raw, .. } => assert_eq!(raw, "not json at all"),
            _ => unreachable!(),
        }
        assert!(!err.is_fatal());
        assert_eq!(err.code().as_code(), 8003);
    }
}
