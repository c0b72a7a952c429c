//! Shared state every handler reads from, assembled once in the
//! orchestrator and cloned cheaply (everything inside is an `Arc`).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::Metrics;
use crate::queue::QueueSender;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub metrics: Arc<Metrics>,
    pub queue_tx: QueueSender,
    pub shutdown_requested: CancellationToken,
}
