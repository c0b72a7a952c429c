//! Router assembly: routes and request tracing. The request-body ceiling
//! is enforced per-request by [`super::extract::ValidatedJson`] so an
//! oversize body gets the service's own `{"error": "..."}` shape instead
//! of a bare middleware-generated response.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers::{create_job, health, list_jobs, metrics};
use super::state::AppState;

pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
