//! Error types for lectern-progress

use thiserror::Error;

/// Result type alias for lectern-progress operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from progress tracking and knowledge check grading
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Content could not be resolved
    #[error(transparent)]
    Content(#[from] lectern_content::Error),

    /// Database failure
    #[error(transparent)]
    Storage(#[from] lectern_storage::StorageError),

    /// Answers could not be encoded for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The referenced lesson, module, or check is not part of the course
    #[error("{0} not found")]
    NotFound(String),

    /// The request does not fit the content it refers to
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl Error {
    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error means something does not exist, at any layer.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Content(e) => e.is_not_found(),
            Self::Storage(lectern_storage::StorageError::NotFound(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_across_layers() {
        assert!(Error::not_found("lesson x").is_not_found());
        assert!(Error::from(lectern_content::Error::not_found("course", "nope")).is_not_found());
        assert!(
            Error::from(lectern_storage::StorageError::not_found("row")).is_not_found()
        );
        assert!(!Error::validation("bad choice").is_not_found());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::not_found("lesson rust-101/ownership/x").to_string(),
            "lesson rust-101/ownership/x not found"
        );
    }
}
