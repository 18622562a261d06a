//! Unified error types for the output cache.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Outcache.
///
/// Setup-time variants (`InvalidArgument`, `Configuration`) are fatal and
/// surfaced to the caller. Store-side variants are recoverable: the request
/// path treats them as a cache miss and never reports them to the client.
#[derive(Error, Debug)]
pub enum OutcacheError {
    // ============ Setup Errors ============
    /// Invalid argument passed to a pure cache function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Store Errors ============
    /// Backend I/O failure
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Store call exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Payload compression failure
    #[error("Compression error: {algorithm} - {reason}")]
    Compression { algorithm: String, reason: String },

    // ============ Resource Errors ============
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Request validation error
    #[error("Validation error: {0}")]
    Validation(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OutcacheError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) | Self::InvalidArgument(_) => 400,
            Self::StoreUnavailable(_) | Self::Timeout(_) => 503,
            Self::Configuration(_)
            | Self::Serialization(_)
            | Self::Compression { .. }
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Compression { .. } => "COMPRESSION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument<T: Into<String>>(message: T) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a store unavailable error.
    #[must_use]
    pub fn store_unavailable<T: Into<String>>(message: T) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error came from the store and should degrade to a miss.
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_)
                | Self::Timeout(_)
                | Self::Serialization(_)
                | Self::Compression { .. }
        )
    }

    /// Checks if this error is fatal at setup time.
    #[must_use]
    pub const fn is_setup_failure(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::Configuration(_))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for OutcacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::StoreUnavailable(format!("Redis error: {}", err))
        }
    }
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::PoolError> for OutcacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::StoreUnavailable(format!("Redis pool error: {}", err))
    }
}

impl From<serde_json::Error> for OutcacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {}", err))
    }
}

/// Serializable error response for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Request trace ID for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorResponse {
    /// Creates a new error response from an `OutcacheError`.
    #[must_use]
    pub fn from_error(error: &OutcacheError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            trace_id: None,
        }
    }

    /// Sets the trace ID.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<&OutcacheError> for ErrorResponse {
    fn from(error: &OutcacheError) -> Self {
        Self::from_error(error)
    }
}
