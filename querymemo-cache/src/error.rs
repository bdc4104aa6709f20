//! Error types for query cache operations
//!
//! Store backends report failures through [`CacheError`]. The accessor layer
//! never hands these to its callers; they are logged and degraded to a miss
//! or a no-op (see [`crate::cache::QueryCache`]).

use thiserror::Error;

/// Main error type for cache store operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Store unavailable or the store operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}
