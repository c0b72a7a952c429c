//! Core library for the in-memory job queue service: domain types, the
//! record store and its state machine, the notification queue, the worker
//! pool, the retry sweeper, startup recovery, configuration, and the HTTP
//! ingress surface. `src/bin/server.rs` is the thin process entry point
//! that wires these together.

pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod queue;
pub mod recovery;
pub mod store;
pub mod sweeper;
pub mod worker;

pub use domain::{Job, JobStatus, Metrics, MetricsSnapshot};
pub use error::JobError;
pub use store::Store;
