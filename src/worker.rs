//! The consumer side of the queue: claim, execute, report.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::Metrics;
use crate::queue::QueueReceiver;
use crate::store::Store;

/// The work a claimed job actually does. Deterministic failure for the
/// two built-in job types the scenario tests rely on (`"always_fails"` and
/// `"email"`); every other type sleeps briefly and succeeds. Kept as a
/// plain function pointer rather than a trait object — there is exactly
/// one executor in this service, swapping it is a recompile, not a plugin.
pub async fn default_executor(job_type: &str) -> Result<(), String> {
    if job_type == "always_fails" || job_type == "email" {
        return Err("Email sending failed".to_string());
    }
    sleep(Duration::from_secs(1)).await;
    Ok(())
}

/// One worker task: pulls an id off the shared receiver, claims the
/// matching job, executes it, and reports the outcome back to the store
/// and counter sink. Runs until `workers_stop` trips.
pub struct Worker {
    pub id: usize,
    pub store: Arc<Store>,
    pub metrics: Arc<Metrics>,
    pub queue_rx: QueueReceiver,
    pub workers_stop: CancellationToken,
}

impl Worker {
    pub async fn run(self) {
        info!(worker_id = self.id, "worker started");
        loop {
            let next = tokio::select! {
                biased;
                _ = self.workers_stop.cancelled() => None,
                id = async { self.queue_rx.lock().await.recv().await } => id,
            };

            let Some(job_id) = next else {
                break;
            };

            self.process(&job_id).await;
        }
        info!(worker_id = self.id, "worker stopped");
    }

    async fn process(&self, job_id: &str) {
        let job = match self.store.claim(job_id, &self.workers_stop) {
            Ok(job) => job,
            Err(err) => {
                // The sweeper or another worker may have already moved this
                // job on; that's not this worker's problem.
                debug!(worker_id = self.id, job_id, %err, "skipped claim");
                return;
            }
        };

        self.metrics.gauge_in_progress_incr();
        debug!(worker_id = self.id, job_id, job_type = %job.job_type, "job claimed");

        // Race execution against cancellation: a job must never be left in
        // `processing` when shutdown is requested mid-flight.
        let outcome = tokio::select! {
            biased;
            _ = self.workers_stop.cancelled() => Err("aborted due to shutdown".to_string()),
            result = default_executor(&job.job_type) => result,
        };

        self.metrics.gauge_in_progress_decr();

        // Status recording must succeed even if cancellation already
        // tripped above, so the job never stays stuck in `processing` —
        // use an always-open token for this one write regardless of the
        // worker's own shutdown state.
        let write_cancel = CancellationToken::new();

        match outcome {
            Ok(()) => {
                if let Err(err) = self.store.mark_completed(job_id, &write_cancel) {
                    warn!(worker_id = self.id, job_id, %err, "failed to record completion");
                    return;
                }
                self.metrics.incr_completed();
                info!(worker_id = self.id, job_id, "job completed");
            }
            Err(reason) => {
                if let Err(err) = self.store.mark_failed(job_id, reason.clone(), &write_cancel) {
                    warn!(worker_id = self.id, job_id, %err, "failed to record failure");
                    return;
                }
                self.metrics.incr_failed();
                warn!(worker_id = self.id, job_id, %reason, "job failed");
            }
        }
    }
}
