//! One-shot startup routine: reconciles the store with the fact that
//! whatever was `processing` when the process last exited certainly isn't
//! being worked on anymore, and makes sure every `pending` job is actually
//! sitting in the notification queue (the in-memory queue starts empty on
//! every boot, so every pending job needs a fresh enqueue).

use std::time::Duration;

use anyhow::{bail, Context};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::JobStatus;
use crate::queue::QueueSender;
use crate::store::Store;

/// Summary of what recovery did, logged by the orchestrator. Not part of
/// any wire response.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoveryReport {
    pub demoted: usize,
    pub requeued: usize,
}

const ENQUEUE_MAX_ATTEMPTS: u32 = 10;
const ENQUEUE_INITIAL_WAIT: Duration = Duration::from_millis(50);
const ENQUEUE_BACKOFF_FACTOR: f64 = 1.5;
const ENQUEUE_MAX_WAIT: Duration = Duration::from_secs(5);

/// Runs before the listener starts accepting connections, so no client can
/// observe a job stuck `processing` from a previous crash.
///
/// Unlike the sweeper, recovery must not drop a job on a full queue — it
/// has no next tick to retry on. It blocks with exponential backoff and,
/// if the queue still refuses after its budget, treats that as fatal: the
/// caller should abort startup rather than boot with a pending job nothing
/// will ever see.
pub async fn recover(
    store: &Store,
    queue_tx: &QueueSender,
    cancel: &CancellationToken,
) -> anyhow::Result<RecoveryReport> {
    let demoted = store
        .recover_stuck_processing(cancel)
        .context("failed to scan for stuck processing jobs")?;

    if !demoted.is_empty() {
        info!(count = demoted.len(), "recovered stuck processing jobs");
    }

    // Every job that is now pending — whether it was just demoted above or
    // was already pending before the restart — needs to be back in the
    // queue, since the in-memory queue never survives a restart.
    let pending = store
        .list_by_status(JobStatus::Pending, cancel)
        .context("failed to list pending jobs")?;

    let mut requeued = 0;
    for job in &pending {
        enqueue_blocking_with_backoff(queue_tx, &job.id)
            .await
            .with_context(|| format!("failed to re-enqueue job {} during recovery", job.id))?;
        requeued += 1;
    }

    let report = RecoveryReport {
        demoted: demoted.len(),
        requeued,
    };
    info!(?report, "recovery complete");
    Ok(report)
}

/// Blocking publish with exponential backoff: 50 ms initial wait, ×1.5
/// factor, capped at 5 s, up to 10 attempts total. Returns an error (fatal
/// to the orchestrator) if the queue still has no room after the budget is
/// exhausted.
async fn enqueue_blocking_with_backoff(queue_tx: &QueueSender, job_id: &str) -> anyhow::Result<()> {
    enqueue_blocking_with_backoff_params(
        queue_tx,
        job_id,
        ENQUEUE_MAX_ATTEMPTS,
        ENQUEUE_INITIAL_WAIT,
        ENQUEUE_BACKOFF_FACTOR,
        ENQUEUE_MAX_WAIT,
    )
    .await
}

/// Parameterized so tests can exercise the fatal-abort path without
/// waiting out the real (multi-second) production schedule.
async fn enqueue_blocking_with_backoff_params(
    queue_tx: &QueueSender,
    job_id: &str,
    max_attempts: u32,
    initial_wait: Duration,
    backoff_factor: f64,
    max_wait: Duration,
) -> anyhow::Result<()> {
    let mut wait = initial_wait;
    for attempt in 1..=max_attempts {
        match queue_tx.try_send(job_id.to_string()) {
            Ok(()) => return Ok(()),
            Err(_) if attempt < max_attempts => {
                warn!(job_id, attempt, wait_ms = wait.as_millis() as u64, "queue full, backing off");
                sleep(wait).await;
                wait = wait.mul_f64(backoff_factor).min(max_wait);
            }
            Err(_) => bail!("queue still full after {max_attempts} attempts"),
        }
    }
    unreachable!("loop always returns or bails on its final iteration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Job;
    use crate::queue;
    use serde_json::json;

    #[tokio::test]
    async fn enqueues_immediately_when_queue_has_room() {
        let (tx, rx) = queue::bounded(4);
        enqueue_blocking_with_backoff(&tx, "job-1").await.unwrap();
        assert_eq!(rx.lock().await.try_recv().unwrap(), "job-1");
    }

    #[tokio::test]
    async fn backs_off_then_succeeds_once_a_slot_frees_up() {
        let (tx, rx) = queue::bounded(1);
        tx.try_send("occupied".to_string()).unwrap();

        let tx_clone = tx.clone();
        let waiter = tokio::spawn(async move { enqueue_blocking_with_backoff(&tx_clone, "job-2").await });

        // Drain the one slot after the first backoff wait has started, so
        // the second attempt inside the loop succeeds.
        tokio::time::sleep(Duration::from_millis(60)).await;
        rx.lock().await.recv().await.unwrap();

        waiter.await.unwrap().unwrap();
        assert_eq!(rx.lock().await.try_recv().unwrap(), "job-2");
    }

    #[tokio::test]
    async fn fatal_abort_once_backoff_attempts_are_exhausted() {
        // A capacity-1 queue whose only slot is permanently held: every
        // attempt sees it full. Small parameters keep this test fast while
        // exercising the exact same loop the production constants drive.
        let (tx, _rx) = queue::bounded(1);
        tx.try_send("permanently-occupied".to_string()).unwrap();

        let result = enqueue_blocking_with_backoff_params(
            &tx,
            "job-3",
            3,
            Duration::from_millis(1),
            1.5,
            Duration::from_millis(10),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn recover_demotes_and_requeues_against_a_roomy_queue() {
        let store = Store::new();
        let cancel = CancellationToken::new();
        let job = Job::new("notify", json!({}), 3);
        let job = store.create(job, &cancel).unwrap();
        store.claim(&job.id, &cancel).unwrap();

        let (tx, rx) = queue::bounded(10);
        let report = recover(&store, &tx, &cancel).await.unwrap();

        assert_eq!(report.demoted, 1);
        assert_eq!(report.requeued, 1);
        assert_eq!(store.get(&job.id).unwrap().status, crate::domain::JobStatus::Pending);
        assert_eq!(rx.lock().await.try_recv().unwrap(), job.id);
    }
}
