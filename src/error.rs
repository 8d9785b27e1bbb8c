//! Unified error handling for the kurator crate
//!
//! This module provides a unified error type that consolidates all
//! domain-specific errors into a single `Error` enum, while maintaining the
//! ability to use domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! The engine itself never distinguishes transient from permanent failures:
//! every kind is mapped to log-and-continue at the matching loop layer. The
//! category and recoverability hints exist for observability and tests, not
//! for control flow.

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{ClassifyError, FetchError, GenerateError};

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// LLM classification errors
    Classification,
    /// Draft generation errors
    Generation,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get string representation for log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Classification => "classification",
            Self::Generation => "generation",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the kurator crate
///
/// This enum wraps all domain-specific errors, providing a single error type
/// that can be used across module boundaries while preserving the detailed
/// error information.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Classification errors
    #[error("Classify error: {0}")]
    Classify(#[from] ClassifyError),

    /// Draft generation errors
    #[error("Generate error: {0}")]
    Generate(#[from] GenerateError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Connection pool errors
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Check if this error is recoverable (worth retrying later)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => !matches!(e, FetchError::InvalidChannel(_)),
            Self::Classify(e) => !matches!(e, ClassifyError::BadVerdict(_)),
            Self::Generate(_) => true,
            Self::Database(_) | Self::Pool(_) => true,
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Http(_) => true, // HTTP errors are often transient
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) | Self::Http(_) => ErrorCategory::Network,
            Self::Classify(_) => ErrorCategory::Classification,
            Self::Generate(_) => ErrorCategory::Generation,
            Self::Database(_) | Self::Pool(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Other,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
