//! Error types for the kurator engine's external collaborators
//!
//! This module defines the closed set of error kinds the engine handles:
//! fetch, classification, and generation failures. Each one is non-fatal by
//! design; the engine logs and continues at the matching loop layer.

use thiserror::Error;

/// Errors that can occur while fetching channel posts
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded")]
    MaxRetriesExceeded,

    /// Channel preview page had no recognizable messages
    #[error("No messages found for channel: {0}")]
    NoMessages(String),

    /// Invalid channel handle
    #[error("Invalid channel handle: {0}")]
    InvalidChannel(String),
}

/// Errors that can occur while classifying a post
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// Model request failed (network, status, decode)
    #[error("Model request failed: {0}")]
    Request(#[source] anyhow::Error),

    /// Model returned an empty completion
    #[error("Empty model response")]
    EmptyResponse,

    /// Verdict JSON could not be parsed
    #[error("Unparseable verdict: {0}")]
    BadVerdict(String),
}

/// Errors that can occur while generating a draft publication
///
/// Persistence failures inside the pipeline surface as database errors, not
/// as a generation kind.
#[derive(Error, Debug)]
pub enum GenerateError {
    /// Text generation failed
    #[error("Text generation failed: {0}")]
    Text(#[source] anyhow::Error),

    /// Image generation failed
    #[error("Image generation failed: {0}")]
    Image(#[source] anyhow::Error),
}
