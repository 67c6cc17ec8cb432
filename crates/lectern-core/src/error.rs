//! Error types for lectern-core

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for lectern-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in lectern-core
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error without path context
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a specific path
    #[error("I/O error at {}: {source}", path.display())]
    IoWithPath {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Invalid or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Content or data could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A requested item does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_with_path_display() {
        let err = Error::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/course.yaml",
        );
        assert_eq!(err.to_string(), "I/O error at /tmp/course.yaml: gone");
    }

    #[test]
    fn test_constructors() {
        assert!(matches!(Error::config("x"), Error::Config(_)));
        assert!(matches!(Error::parse("x"), Error::Parse(_)));
        assert_eq!(Error::not_found("rust-101").to_string(), "Not found: rust-101");
    }
}
