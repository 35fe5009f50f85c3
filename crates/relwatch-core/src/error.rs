//! Error types for relwatch.
//!
//! Upstream fetch problems are not errors here: they travel as
//! [`FetchFailure`](crate::network::FetchFailure) values and end up inside
//! canonical records. `RelwatchError` covers the plumbing around them
//! (storage, configuration, input validation).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the relwatch core.
#[derive(Debug, Error)]
pub enum RelwatchError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("unsupported package type: {0}")]
    UnsupportedSource(String),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for relwatch operations.
pub type Result<T> = std::result::Result<T, RelwatchError>;

impl From<std::io::Error> for RelwatchError {
    fn from(err: std::io::Error) -> Self {
        RelwatchError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for RelwatchError {
    fn from(err: serde_json::Error) -> Self {
        RelwatchError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for RelwatchError {
    fn from(err: rusqlite::Error) -> Self {
        RelwatchError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for RelwatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelwatchError::Timeout(std::time::Duration::from_secs(0))
        } else {
            RelwatchError::Network {
                message: err.to_string(),
                cause: Some(err.to_string()),
            }
        }
    }
}

impl RelwatchError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        RelwatchError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Shorthand for a database error that has no underlying rusqlite error,
    /// e.g. a poisoned connection lock.
    pub(crate) fn database(message: impl Into<String>) -> Self {
        RelwatchError::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the error was caused by bad caller input rather than by the
    /// system itself.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RelwatchError::Validation { .. } | RelwatchError::UnsupportedSource(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RelwatchError::UnsupportedSource("cargo".into());
        assert_eq!(err.to_string(), "unsupported package type: cargo");

        let err = RelwatchError::Validation {
            field: "packages".into(),
            message: "empty".into(),
        };
        assert_eq!(err.to_string(), "Validation error for packages: empty");
    }

    #[test]
    fn test_user_errors() {
        assert!(RelwatchError::UnsupportedSource("x".into()).is_user_error());
        assert!(!RelwatchError::Timeout(std::time::Duration::from_secs(10)).is_user_error());
        assert!(!RelwatchError::database("locked").is_user_error());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RelwatchError = io.into();
        assert!(matches!(err, RelwatchError::Io { path: None, .. }));
    }
}
