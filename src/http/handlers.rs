//! Request/response shapes and the handler functions wired into the router.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::domain::{Job, JobStatus, MetricsSnapshot};
use crate::error::JobError;

use super::extract::ValidatedJson;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `POST /jobs`. Creates the record, then enqueues it for pickup. If the
/// queue is momentarily full the job is rolled back out of the store
/// rather than left stranded pending with nothing to ever claim it.
pub async fn create_job(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<Job>), JobError> {
    if state.shutdown_requested.is_cancelled() {
        return Err(JobError::ShuttingDown);
    }
    if request.job_type.trim().is_empty() {
        return Err(JobError::BadRequest("`type` must not be empty".to_string()));
    }

    let job = Job::new(request.job_type, request.payload, request.max_retries.unwrap_or(3));
    let job = state.store.create(job, &state.shutdown_requested)?;
    state.metrics.incr_created();

    if state.queue_tx.try_send(job.id.clone()).is_err() {
        // Queue is full: undo the creation and counter so the store never
        // holds a pending job nothing will ever pick up.
        let _ = state.store.delete(&job.id, &state.shutdown_requested);
        state.metrics.decr_created();
        return Err(JobError::QueueFull);
    }

    Ok((StatusCode::CREATED, Json(job)))
}

/// `GET /jobs`, optionally filtered by `?status=`.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Job>>, JobError> {
    let mut jobs = match query.status.as_deref() {
        None => state.store.list_all(&state.shutdown_requested)?,
        Some(raw) => {
            let status = parse_status(raw)?;
            state.store.list_by_status(status, &state.shutdown_requested)?
        }
    };
    jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(jobs))
}

fn parse_status(raw: &str) -> Result<JobStatus, JobError> {
    match raw {
        "pending" => Ok(JobStatus::Pending),
        "processing" => Ok(JobStatus::Processing),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        other => Err(JobError::BadRequest(format!("unknown status `{other}`"))),
    }
}

/// `GET /metrics`.
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// `GET /health`. Cheap and side-effect free: once the listener is
/// serving requests, the process is healthy by definition — there is no
/// database connection to probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
