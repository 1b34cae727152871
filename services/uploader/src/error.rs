//! Custom error types for the uploader

use reqwest::StatusCode;
use thiserror::Error;

/// Custom error type for the uploader
#[derive(Error, Debug)]
pub enum ClientError {
    /// Selected file is neither an accepted image nor video type
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Configured API base URL cannot be parsed
    #[error("Invalid API base URL {0}")]
    InvalidBaseUrl(String),

    /// Request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Conversion endpoint answered with a non-success status
    #[error("Conversion endpoint returned {0}")]
    Status(StatusCode),

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Clipboard denied access or is unavailable
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Media dimensions could not be read
    #[error("Probe error: {0}")]
    Probe(String),

    /// Copy or download requested while no result is available
    #[error("No conversion result available")]
    NoResult,

    /// Local file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Preference store error
    #[error("Store error: {0}")]
    Store(#[from] common::error::StoreError),
}

/// Type alias for uploader results
pub type ClientResult<T> = Result<T, ClientError>;
