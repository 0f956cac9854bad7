//! Error types for Nova
//!
//! One error enum for the library; the binary and configuration plumbing
//! wrap it in `anyhow` where context strings matter more than variants.

use thiserror::Error;

/// Main error type for the Nova assistant
#[derive(Error, Debug)]
pub enum NovaError {
    /// SQLite errors from the memory store
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Ollama API errors (non-2xx, malformed payloads)
    #[error("Ollama API error: {0}")]
    OllamaApi(String),

    /// Streaming errors
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A lexicon pattern failed to compile
    #[error("Invalid pattern for '{key}': {source}")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    /// The user sent nothing to answer
    #[error("Empty message")]
    EmptyMessage,

    /// Generic errors with context
    #[error("Nova error: {0}")]
    Generic(String),
}

/// Result type alias for Nova operations
pub type Result<T> = std::result::Result<T, NovaError>;

impl From<anyhow::Error> for NovaError {
    fn from(err: anyhow::Error) -> Self {
        NovaError::Generic(err.to_string())
    }
}
