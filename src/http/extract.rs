//! A `Json` wrapper that enforces the request-body ceiling and maps
//! extraction failures to the service's own error kinds (`oversize_request`,
//! `bad_request`) instead of axum's defaults, so the error table in the
//! HTTP surface stays exact — including the `{"error": "..."}` body shape
//! on every failure path, not just a bare 413/422.

use axum::async_trait;
use axum::body::to_bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::JobError;

/// Reference body ceiling from §4.6: 1 MiB.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = JobError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let body = req.into_body();
        let bytes = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| JobError::OversizeRequest)?;

        let value = serde_json::from_slice(&bytes)
            .map_err(|err| JobError::BadRequest(err.to_string()))?;

        Ok(ValidatedJson(value))
    }
}
