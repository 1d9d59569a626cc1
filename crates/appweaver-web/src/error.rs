//! HTTP error mapping.

use appweaver::{GenerationError, ImageError, RepositoryError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Everything a handler can fail with, mapped onto a status code and a
/// `{"error": ..., "code": ...}` body.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("missing x-user-id header")]
    MissingUser,

    /// Unknown id, or a project owned by someone else.
    #[error("project not found")]
    NotFound,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// The JSON body was refused before reaching the handler.
    #[error("{message}")]
    Body { status: StatusCode, message: String },

    #[error("{0}")]
    Conflict(String),

    #[error("attachment {name}: {source}")]
    Attachment {
        name: String,
        #[source]
        source: ImageError,
    },

    /// A blocking helper task died.
    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: String,
    code: &'static str,
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingUser => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound | ServiceError::FileNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) | ServiceError::Attachment { .. } => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Body { status, .. } => *status,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Generation(GenerationError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            ServiceError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Ids are validated by the store; a malformed one names nothing.
            ServiceError::Repository(RepositoryError::InvalidId(_)) => StatusCode::NOT_FOUND,
            ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::MissingUser => "UNAUTHENTICATED",
            ServiceError::NotFound | ServiceError::Repository(RepositoryError::InvalidId(_)) => {
                "PROJECT_NOT_FOUND"
            }
            ServiceError::FileNotFound(_) => "FILE_NOT_FOUND",
            ServiceError::Body { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "PAYLOAD_TOO_LARGE"
            }
            ServiceError::BadRequest(_) | ServiceError::Body { .. } => "INVALID_REQUEST",
            ServiceError::Conflict(_) => "GENERATION_IN_PROGRESS",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
            ServiceError::Attachment {
                source: ImageError::Compression { .. },
                ..
            } => "COMPRESSION_ERROR",
            ServiceError::Attachment { .. } => "INVALID_ATTACHMENT",
            ServiceError::Generation(GenerationError::Upstream(_)) => "UPSTREAM_ERROR",
            ServiceError::Generation(_) => "GENERATION_ERROR",
            ServiceError::Repository(_) => "STORAGE_ERROR",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        }
        let body = ErrorEnvelope {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
