//! Error taxonomy for the generation engine.
//!
//! Each concern gets its own enum so callers can match on exactly the
//! failures they can act on:
//!
//! | Error | Raised by | Surfaced? |
//! |-------|-----------|-----------|
//! | [`ImageError`] | [`vision::normalize`](crate::vision::normalize) | Dropped by the content builder; 400 at the HTTP boundary |
//! | [`ApiError`] | [`OpenRouterClient`](crate::OpenRouterClient) | Retried when transient, then surfaced as-is |
//! | [`GenerationError`] | [`Harness::run()`](crate::agent::Harness::run) and generators | Terminal |
//! | [`RepositoryError`] | [`ProjectRepository`](crate::project::ProjectRepository) | Terminal |
//!
//! Malformed `write_file` invocations never show up here: the loop turns them
//! into error tool results so the model can retry within the conversation.

use std::time::Duration;
use thiserror::Error;

/// Failures while decoding or shrinking an image attachment.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The attachment payload was not valid base64.
    #[error("invalid base64 image payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// An inline image attachment with no payload.
    #[error("image attachment has no data")]
    Empty,

    /// The bytes could not be decoded as a supported image format.
    #[error("unreadable image: {0}")]
    Decode(String),

    /// Encoding failed at some quality step.
    #[error("image encoding failed: {0}")]
    Encode(String),

    /// The image stayed over the byte ceiling even at the quality floor.
    #[error(
        "image could not be compressed below {max_bytes} bytes \
         (smallest attempt: {smallest} bytes at quality {floor})"
    )]
    Compression {
        max_bytes: usize,
        smallest: usize,
        floor: u8,
    },
}

/// Failures talking to the LLM provider.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request exceeded the client's timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection-level failure (DNS, reset, TLS, ...).
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status from the provider.
    #[error("OpenRouter API HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The provider returned an error object inside a 200 response.
    #[error("OpenRouter API error: {0}")]
    Provider(String),

    /// The response body did not match the expected schema.
    #[error("failed to parse response: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    ///
    /// Timeouts, transport failures, 429 and 5xx are transient. Client
    /// errors (400, 401, 403, 404, 422), provider errors and decode failures
    /// are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout(_) | ApiError::Transport(_) => true,
            ApiError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            ApiError::Provider(_) | ApiError::Decode(_) | ApiError::Client(_) => false,
        }
    }
}

/// Terminal failures of one generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The loop finished without a single file in the accumulator.
    #[error("no files produced; try a more specific prompt")]
    NoFiles,

    /// The LLM could not be reached or rejected the request.
    #[error(transparent)]
    Upstream(#[from] ApiError),

    /// The blocking attachment-processing task died.
    #[error("attachment processing failed: {0}")]
    Attachments(String),
}

/// Failures reading or writing persisted project records.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("project store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt project record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Ids become file names; anything but `[A-Za-z0-9_-]` is refused.
    #[error("invalid project id: {0:?}")]
    InvalidId(String),
}
