//! Custom error types for the common library
//!
//! This module defines the error types raised by the shared key-value
//! storage used for persisted client preferences.

use thiserror::Error;

/// Custom error type for key-value store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error occurred while reading or writing the backing file
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file does not hold a valid key-value document
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Store configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
