//! Periodic retry promotion: demotes exhausted-but-retryable failed jobs
//! back to pending, then re-publishes every currently-pending id so a job
//! that slipped out of the queue for any reason (a sweeper publish that
//! lost a race against a full queue on a prior tick, in particular) isn't
//! stranded `pending` forever with nothing left to ever claim it.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{JobStatus, Metrics};
use crate::queue::QueueSender;
use crate::store::Store;

pub struct Sweeper {
    pub store: Arc<Store>,
    pub metrics: Arc<Metrics>,
    pub queue_tx: QueueSender,
    pub interval: Duration,
    pub workers_stop: CancellationToken,
}

impl Sweeper {
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "sweeper started");
        let mut ticker = interval(self.interval);
        loop {
            tokio::select! {
                _ = self.workers_stop.cancelled() => break,
                _ = ticker.tick() => self.sweep(),
            }
        }
        info!("sweeper stopped");
    }

    fn sweep(&self) {
        let demoted = match self.store.retry_eligible_failed(&self.workers_stop) {
            Ok(ids) => ids,
            Err(err) => {
                warn!(%err, "sweep skipped");
                return;
            }
        };

        for _ in &demoted {
            self.metrics.incr_retried();
        }

        let pending = match self.store.list_by_status(JobStatus::Pending, &self.workers_stop) {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(%err, "sweep could not list pending jobs");
                return;
            }
        };

        // Re-publish every pending id, not just the ones just demoted —
        // a non-blocking publish on a prior tick may have lost a race
        // against a full queue, and retry_eligible_failed only revisits
        // `failed` jobs, so this is the only thing that would ever notice
        // a pending job with nothing in the queue for it.
        let mut requeued = 0;
        for job in &pending {
            match self.queue_tx.try_send(job.id.clone()) {
                Ok(()) => requeued += 1,
                Err(_) => debug!(job_id = %job.id, "sweeper skipped re-publish, queue full"),
            }
        }

        if !demoted.is_empty() || requeued > 0 {
            info!(demoted = demoted.len(), pending = pending.len(), requeued, "sweep tick complete");
        }
    }
}
