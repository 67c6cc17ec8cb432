//! Error types for lectern-content

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for lectern-content operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving content
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from lectern-core
    #[error("Core error: {0}")]
    Core(#[from] lectern_core::Error),

    /// Filesystem error while reading content
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// File or directory being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A course or module YAML file could not be parsed
    #[error("Invalid YAML in {}: {message}", path.display())]
    Yaml {
        /// The offending file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A course, module, or lesson does not exist
    #[error("{kind} '{slug}' not found{}", hint(.suggestion))]
    NotFound {
        /// "course", "module", "lesson", or "knowledge check"
        kind: &'static str,
        /// The slug that was requested
        slug: String,
        /// Closest existing slug, if any is similar enough
        suggestion: Option<String>,
    },

    /// Content is structurally invalid (duplicate slugs, dangling references)
    #[error("Invalid content in {}: {message}", path.display())]
    Invalid {
        /// Directory or file the problem was found in
        path: PathBuf,
        /// What is wrong
        message: String,
    },
}

fn hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

impl Error {
    /// Create an I/O error carrying the path.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a not-found error without a suggestion.
    pub fn not_found(kind: &'static str, slug: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            slug: slug.into(),
            suggestion: None,
        }
    }

    /// Create an invalid-content error.
    pub fn invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error means "the thing asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
