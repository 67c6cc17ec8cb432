//! Error types for lectern-api.
//!
//! [`Error`] covers server startup. [`ApiError`] is what handlers return;
//! it renders as `{"error": {"category": ..., "message": ...}}` with a
//! matching status code.

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use lectern_auth::AuthError;
use lectern_storage::StorageError;
use serde_json::json;
use thiserror::Error;

/// Result type alias for server startup
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or running the server
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Configuration problem
    #[error("Core error: {0}")]
    Core(#[from] lectern_core::Error),

    /// Database could not be opened
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Listener failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handler error rendered as a JSON envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Category string in the response body.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::Unauthorized(_) => "authentication",
            Self::Forbidden(_) => "authorization",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = json!({
            "error": {
                "category": self.category(),
                "message": message,
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<lectern_content::Error> for ApiError {
    fn from(err: lectern_content::Error) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => Self::NotFound(msg),
            StorageError::Conflict(msg) => Self::Conflict(msg),
            StorageError::Invalid(msg) => Self::Validation(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<lectern_progress::Error> for ApiError {
    fn from(err: lectern_progress::Error) -> Self {
        match err {
            lectern_progress::Error::NotFound(what) => Self::NotFound(format!("{what} not found")),
            lectern_progress::Error::Validation(msg) => Self::Validation(msg),
            lectern_progress::Error::Content(e) => e.into(),
            lectern_progress::Error::Storage(e) => e.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::WeakPassword { .. } => Self::Validation(err.to_string()),
            e if e.is_client_error() => Self::Unauthorized(e.to_string()),
            e => Self::Internal(e.to_string()),
        }
    }
}
