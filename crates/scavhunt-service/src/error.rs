//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use scavhunt_core::DomainError;
use scavhunt_ledger::LedgerError;
use scavhunt_store::StoreError;

use crate::approval::WorkflowError;
use crate::upload::UploadError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The uploaded file has an extension the pipeline cannot handle.
    #[error("unsupported media type: .{0}")]
    UnsupportedMedia(String),

    /// Uploads are outside the configured submission window.
    #[error("submissions are closed")]
    SubmissionsClosed,

    /// A chunk was missing when a chunked upload was reassembled.
    #[error("missing chunk {index} of \"{file}\"")]
    MissingChunk {
        /// Sanitized file name the chunks belong to.
        file: String,
        /// Index of the first missing chunk.
        index: u32,
    },

    /// The media file could not be recompressed.
    #[error("compression failed: {0}")]
    Compression(String),

    /// A multi-step approve or deny sequence stopped part-way.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::UnsupportedMedia(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                self.to_string(),
                None,
            ),
            Self::SubmissionsClosed => (
                StatusCode::FORBIDDEN,
                "submissions_closed",
                self.to_string(),
                None,
            ),
            Self::MissingChunk { file, index } => (
                StatusCode::BAD_REQUEST,
                "missing_chunk",
                self.to_string(),
                Some(serde_json::json!({
                    "file": file,
                    "index": index
                })),
            ),
            Self::Compression(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "compression_failed",
                format!("compression failed: {msg}"),
                None,
            ),
            Self::Workflow(err) => {
                // The raw cause can carry backend error text; log it and
                // hand the client only the failing step.
                tracing::error!(error = %err, "Review workflow stopped part-way");
                let (code, step) = match err {
                    WorkflowError::Approval { step, .. } => ("approval_failed", step),
                    WorkflowError::Denial { step, .. } => ("denial_failed", step),
                };
                (
                    StatusCode::BAD_GATEWAY,
                    code,
                    "The review could not be completed; the ledger may need attention".to_string(),
                    Some(serde_json::json!({ "step": step })),
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UserAlreadyExists { username } => {
                Self::Conflict(format!("user already exists: {username}"))
            }
            LedgerError::UserNotFound { username } => {
                Self::NotFound(format!("user not found: {username}"))
            }
            LedgerError::TaskNotFound { task } => Self::NotFound(format!("task not found: {task}")),
            LedgerError::StatusRowNotFound { user, task } => {
                Self::NotFound(format!("no pending submission of \"{task}\" by {user}"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingChunk { file, index } => Self::MissingChunk { file, index },
            UploadError::UnsupportedMediaType { extension } => Self::UnsupportedMedia(extension),
            UploadError::Compression(msg) => Self::Compression(msg),
            UploadError::Scratch(e) => Self::Internal(e.to_string()),
        }
    }
}
