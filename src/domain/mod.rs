//! Core domain types: the job record and the operational counter sink.

mod job;
mod metrics;

pub use job::{Job, JobStatus};
pub use metrics::{Metrics, MetricsSnapshot};
