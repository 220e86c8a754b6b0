//! Error types for IndexSync.
//!
//! Library crates use [`IndexSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all IndexSync operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexSyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the search engine.
    #[error("transport error: {0}")]
    Transport(String),

    /// The search engine accepted the request but reported a failure.
    #[error("index error: {0}")]
    Index(String),

    /// Strategy stack misuse (imbalanced pop, unknown policy name, closed frame).
    #[error("strategy error: {message}")]
    Strategy { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed pattern, invalid schema fragment, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IndexSyncError>;

impl IndexSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a strategy error from any displayable message.
    pub fn strategy(msg: impl Into<String>) -> Self {
        Self::Strategy {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
