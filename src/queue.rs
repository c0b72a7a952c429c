//! The bounded notification queue connecting producers (ingress, sweeper,
//! recovery) to the worker pool.
//!
//! `tokio::sync::mpsc` has one receiver; workers are multiple independent
//! tasks. The idiomatic way to fan a single receiver out to N consumers
//! without a dedicated MPMC crate is to share it behind an async mutex —
//! each worker takes the lock only for the duration of one `recv`.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

/// Clone-able handle producers use to publish a job id for pickup.
pub type QueueSender = mpsc::Sender<String>;

/// Shared handle workers use to pull the next id; cloning just bumps the
/// `Arc` refcount, all clones see the same underlying channel.
pub type QueueReceiver = Arc<Mutex<mpsc::Receiver<String>>>;

/// Builds the bounded channel and wraps the receiving end for multi-worker
/// sharing. `capacity` is the backpressure limit from `JOB_QUEUE_CAPACITY`.
pub fn bounded(capacity: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, Arc::new(Mutex::new(rx)))
}
