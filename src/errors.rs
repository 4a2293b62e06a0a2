//! Error types for the storage layer and the admin API.
//!
//! [`StorageError`] classifies object-store failures so callers can tell a
//! missing key from a throttled provider from a credentials problem.
//! [`AdminError`] implements [`axum::response::IntoResponse`] so admin
//! handlers can simply return `Err(AdminError::InvalidInput { .. })`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Object-store failure classification.
///
/// A `get` for an absent key is *not* an error -- backends return
/// `Ok(None)` for that case.  `NotFound` here means the operation's target
/// (bucket, container) was missing.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage target does not exist.
    #[error("not found: {key}")]
    NotFound { key: String },

    /// The provider rejected the request for authorization reasons.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// Transient provider or network failure.
    #[error("storage {context} failed: {message}")]
    Io { context: String, message: String },
}

impl StorageError {
    /// Build a [`StorageError::Io`] with operation context.
    pub fn io(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        StorageError::Io {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

/// Admin API failure, mapped onto the administrative status-code contract.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Malformed stub JSON, invalid matcher, or a bad identifier.
    #[error("{message}")]
    InvalidInput { message: String },

    /// The addressed resource does not exist.
    #[error("{message}")]
    NotFound { message: String },

    /// The path is known but the method is not supported on it.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The admin sub-path is not part of the API.
    #[error("Unknown admin request: {path}")]
    UnknownPath { path: String },

    /// A storage operation the request depends on failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Catch-all for unexpected internal errors.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AdminError {
    /// Shorthand for an invalid-input failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        AdminError::InvalidInput {
            message: message.into(),
        }
    }

    /// Return the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AdminError::NotFound { .. } => StatusCode::NOT_FOUND,
            AdminError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AdminError::UnknownPath { .. } => StatusCode::NOT_FOUND,
            AdminError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = generate_request_id();

        // Storage and internal failures are logged server-side; the client
        // gets the classification, not the provider detail.
        let body = match &self {
            AdminError::Storage(err) => {
                tracing::error!("admin request failed on storage: {err}");
                "Storage operation failed".to_string()
            }
            AdminError::Internal(err) => {
                tracing::error!("admin request failed unexpectedly: {err:#}");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            [
                ("content-type", "text/plain; charset=utf-8".to_string()),
                ("x-request-id", request_id),
            ],
            body,
        )
            .into_response()
    }
}
