//! Error types for Prepnest.
//!
//! Library crates use [`PrepnestError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Prepnest operations.
#[derive(Debug, thiserror::Error)]
pub enum PrepnestError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Content store rejected a query or mutation.
    #[error("store error: {0}")]
    Store(String),

    /// Generation service failure or unexpected response shape.
    #[error("generation error: {0}")]
    Generation(String),

    /// JSON extraction or deserialization error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Generated output violates the lesson field rules.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrepnestError>;

impl PrepnestError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PrepnestError::config("SANITY_API_TOKEN is required");
        assert_eq!(err.to_string(), "config error: SANITY_API_TOKEN is required");

        let err = PrepnestError::validation("7 learning objectives (max 6)");
        assert!(err.to_string().contains("max 6"));

        let err = PrepnestError::Generation("unexpected response type".into());
        assert_eq!(err.to_string(), "generation error: unexpected response type");
    }
}
