//! The closed set of error kinds the core and its HTTP layer exchange.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

/// Error kinds surfaced by the store, queue, and ingress handlers.
///
/// These are abstract outcomes, not a grab-bag of library error types:
/// each variant maps to exactly one handling strategy for its caller.
#[derive(Debug, Error)]
pub enum JobError {
    /// `create` called with an id already present in the store.
    #[error("job id already exists")]
    DuplicateId,

    /// `update_status`/`claim` referenced an id with no record.
    #[error("job not found")]
    NotFound,

    /// A transition outside the state machine's table was attempted.
    #[error("invalid state transition")]
    InvalidTransition,

    /// The notification queue was full.
    #[error("queue is full")]
    QueueFull,

    /// A cooperative cancellation token had already tripped.
    #[error("operation cancelled")]
    Cancelled,

    /// Request body exceeded the size ceiling.
    #[error("request body too large")]
    OversizeRequest,

    /// Malformed body or empty `type` field.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Ingress rejected new work because shutdown was requested.
    #[error("service is shutting down")]
    ShuttingDown,

    /// Catch-all for anything else; always logged.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        let status = match &self {
            JobError::BadRequest(_) => StatusCode::BAD_REQUEST,
            JobError::OversizeRequest => StatusCode::PAYLOAD_TOO_LARGE,
            JobError::QueueFull => StatusCode::TOO_MANY_REQUESTS,
            JobError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            JobError::DuplicateId
            | JobError::NotFound
            | JobError::InvalidTransition
            | JobError::Cancelled
            | JobError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
