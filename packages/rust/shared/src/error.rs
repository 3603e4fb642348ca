//! Error types for FeatureLens.
//!
//! Library crates use [`FeatureLensError`] via `thiserror`.
//! The server app wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all FeatureLens operations.
#[derive(Debug, thiserror::Error)]
pub enum FeatureLensError {
    /// Configuration loading or validation error (including missing credentials).
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error reaching the code host. Fatal only when the root
    /// listing itself fails; per-file and per-subtree failures are absorbed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The completion call itself failed (network, auth, quota, empty choices).
    #[error("extraction error: {0}")]
    Extraction(String),

    /// The completion succeeded but its content is not parseable JSON matching
    /// the report schema. Reported distinctly from [`Self::Extraction`] so
    /// callers can tell "model unreachable" from "model produced garbage".
    #[error("malformed model output: {message}")]
    MalformedOutput { message: String },

    /// Data validation error (bad repository reference, empty selection, etc.).
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
pub type Result<T> = std::result::Result<T, FeatureLensError>;

impl FeatureLensError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a malformed-output error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedOutput {
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
        let err = FeatureLensError::config("GITHUB_TOKEN not set");
        assert_eq!(err.to_string(), "config error: GITHUB_TOKEN not set");

        let err = FeatureLensError::malformed("expected object, got string");
        assert!(err.to_string().starts_with("malformed model output:"));
    }

    #[test]
    fn extraction_and_malformed_are_distinct() {
        let unreachable = FeatureLensError::Extraction("connection refused".into());
        let garbage = FeatureLensError::malformed("not json");
        assert!(matches!(unreachable, FeatureLensError::Extraction(_)));
        assert!(matches!(garbage, FeatureLensError::MalformedOutput { .. }));
    }
}
