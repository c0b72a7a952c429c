//! The job record and its status enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// Status of a job, per the state machine in [`crate::store::Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A unit of work submitted by a client.
///
/// `payload` is opaque to everything except the client and the executor the
/// worker invokes; the core never parses it.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::new_v4().to_string())]
    pub id: String,

    #[serde(rename = "type")]
    pub job_type: String,

    #[builder(default)]
    pub status: JobStatus,

    #[builder(default = serde_json::Value::Null)]
    pub payload: serde_json::Value,

    #[builder(default = 3)]
    pub max_retries: u32,

    #[builder(default = 0)]
    pub attempts: u32,

    #[builder(default, setter(strip_option))]
    pub last_error: Option<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// A fresh job as ingress creates it: pending, zero attempts.
    pub fn new(job_type: impl Into<String>, payload: serde_json::Value, max_retries: u32) -> Self {
        Job::builder()
            .job_type(job_type.into())
            .payload(payload)
            .max_retries(max_retries)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_uses_type_not_job_type() {
        let job = Job::new("notify", json!({}), 3);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["type"], "notify");
        assert!(value.get("job_type").is_none());
        assert_eq!(value["status"], "pending");
    }

    #[test]
    fn new_job_starts_pending_with_zero_attempts() {
        let job = Job::new("notify", json!({}), 3);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
        assert!(job.last_error.is_none());
    }
}
