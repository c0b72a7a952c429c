//! The authoritative record table and its state machine.
//!
//! One `RwLock` guards the whole table. Every operation takes a shutdown
//! token and bails out with [`JobError::Cancelled`] before acquiring the
//! lock if it has already tripped, so a store operation never starts work
//! it can't finish during shutdown.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{Job, JobStatus};
use crate::error::JobError;

/// In-memory job table. Cheap to construct, intended to be wrapped in an
/// `Arc` and shared across the ingress handlers, workers, sweeper, and the
/// recovery routine.
#[derive(Debug, Default)]
pub struct Store {
    records: RwLock<HashMap<String, Job>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(cancel: &CancellationToken) -> Result<(), JobError> {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        Ok(())
    }

    /// Inserts a new, pending job. Errors if the id is already present.
    pub fn create(&self, job: Job, cancel: &CancellationToken) -> Result<Job, JobError> {
        Self::guard(cancel)?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        if records.contains_key(&job.id) {
            return Err(JobError::DuplicateId);
        }
        records.insert(job.id.clone(), job.clone());
        debug!(job_id = %job.id, "job created");
        Ok(job)
    }

    /// Atomically claims a pending job for processing: `pending -> processing`,
    /// incrementing `attempts`. Fails if the job is missing or not pending.
    pub fn claim(&self, id: &str, cancel: &CancellationToken) -> Result<Job, JobError> {
        Self::guard(cancel)?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let job = records.get_mut(id).ok_or(JobError::NotFound)?;
        if job.status != JobStatus::Pending {
            return Err(JobError::InvalidTransition);
        }
        job.status = JobStatus::Processing;
        job.attempts += 1;
        debug!(job_id = %id, attempts = job.attempts, "job claimed");
        Ok(job.clone())
    }

    /// `processing -> completed`. Fails if the job is missing or not
    /// currently processing.
    pub fn mark_completed(&self, id: &str, cancel: &CancellationToken) -> Result<Job, JobError> {
        Self::guard(cancel)?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let job = records.get_mut(id).ok_or(JobError::NotFound)?;
        if job.status != JobStatus::Processing {
            return Err(JobError::InvalidTransition);
        }
        job.status = JobStatus::Completed;
        debug!(job_id = %id, "job completed");
        Ok(job.clone())
    }

    /// `processing -> failed`, recording `last_error`. Fails if the job is
    /// missing or not currently processing.
    pub fn mark_failed(
        &self,
        id: &str,
        error: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<Job, JobError> {
        Self::guard(cancel)?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let job = records.get_mut(id).ok_or(JobError::NotFound)?;
        if job.status != JobStatus::Processing {
            return Err(JobError::InvalidTransition);
        }
        job.status = JobStatus::Failed;
        job.last_error = Some(error.into());
        warn!(job_id = %id, attempts = job.attempts, "job failed");
        Ok(job.clone())
    }

    /// Deletes a record outright. Fails if the id is unknown.
    pub fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), JobError> {
        Self::guard(cancel)?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.remove(id).ok_or(JobError::NotFound)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.records.read().unwrap_or_else(|e| e.into_inner()).get(id).cloned()
    }

    /// Snapshot of every job, in no particular order — callers that need a
    /// stable order sort the result.
    pub fn list_all(&self, cancel: &CancellationToken) -> Result<Vec<Job>, JobError> {
        Self::guard(cancel)?;
        Ok(self.records.read().unwrap_or_else(|e| e.into_inner()).values().cloned().collect())
    }

    pub fn list_by_status(
        &self,
        status: JobStatus,
        cancel: &CancellationToken,
    ) -> Result<Vec<Job>, JobError> {
        Self::guard(cancel)?;
        Ok(self
            .records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect())
    }

    /// The sweeper's core operation: demotes every `failed` job with
    /// `attempts < max_retries` back to `pending`, returning their ids so
    /// the caller can re-enqueue them. Jobs already at `max_retries` are
    /// left `failed` permanently.
    pub fn retry_eligible_failed(&self, cancel: &CancellationToken) -> Result<Vec<String>, JobError> {
        Self::guard(cancel)?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let mut demoted = Vec::new();
        for job in records.values_mut() {
            if job.status == JobStatus::Failed && job.attempts < job.max_retries {
                job.status = JobStatus::Pending;
                debug!(job_id = %job.id, attempts = job.attempts, max_retries = job.max_retries, "retry eligible, demoted to pending");
                demoted.push(job.id.clone());
            }
        }
        Ok(demoted)
    }

    /// Recovery's core operation: demotes every `processing` job back to
    /// `pending` — a worker that was executing one of these died mid-flight
    /// on the previous run, so its lease is implicitly expired at startup.
    pub fn recover_stuck_processing(&self, cancel: &CancellationToken) -> Result<Vec<String>, JobError> {
        Self::guard(cancel)?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let mut recovered = Vec::new();
        for job in records.values_mut() {
            if job.status == JobStatus::Processing {
                job.status = JobStatus::Pending;
                recovered.push(job.id.clone());
            }
        }
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    fn job() -> Job {
        Job::new("email", json!({"to": "a@example.com"}), 3)
    }

    #[test]
    fn create_then_claim_transitions_to_processing() {
        let store = Store::new();
        let cancel = token();
        let job = store.create(job(), &cancel).unwrap();
        let claimed = store.claim(&job.id, &cancel).unwrap();
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(claimed.attempts, 1);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let store = Store::new();
        let cancel = token();
        let job = store.create(job(), &cancel).unwrap();
        let err = store.create(job, &cancel).unwrap_err();
        assert!(matches!(err, JobError::DuplicateId));
    }

    #[test]
    fn claim_on_non_pending_job_is_invalid() {
        let store = Store::new();
        let cancel = token();
        let job = store.create(job(), &cancel).unwrap();
        store.claim(&job.id, &cancel).unwrap();
        let err = store.claim(&job.id, &cancel).unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition));
    }

    #[test]
    fn mark_failed_records_error_and_preserves_it_through_retry() {
        let store = Store::new();
        let cancel = token();
        let job = store.create(job(), &cancel).unwrap();
        store.claim(&job.id, &cancel).unwrap();
        let failed = store.mark_failed(&job.id, "boom", &cancel).unwrap();
        assert_eq!(failed.last_error.as_deref(), Some("boom"));

        let demoted = store.retry_eligible_failed(&cancel).unwrap();
        assert_eq!(demoted, vec![job.id.clone()]);
        let demoted_job = store.get(&job.id).unwrap();
        assert_eq!(demoted_job.status, JobStatus::Pending);
        assert_eq!(demoted_job.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn failed_job_at_max_retries_is_not_retried() {
        let store = Store::new();
        let cancel = token();
        let job = Job::new("always_fails", json!({}), 1);
        let job = store.create(job, &cancel).unwrap();
        store.claim(&job.id, &cancel).unwrap();
        store.mark_failed(&job.id, "boom", &cancel).unwrap();

        let demoted = store.retry_eligible_failed(&cancel).unwrap();
        assert!(demoted.is_empty());
        assert_eq!(store.get(&job.id).unwrap().status, JobStatus::Failed);
    }

    #[test]
    fn recovery_demotes_processing_to_pending() {
        let store = Store::new();
        let cancel = token();
        let job = store.create(job(), &cancel).unwrap();
        store.claim(&job.id, &cancel).unwrap();

        let recovered = store.recover_stuck_processing(&cancel).unwrap();
        assert_eq!(recovered, vec![job.id.clone()]);
        assert_eq!(store.get(&job.id).unwrap().status, JobStatus::Pending);
    }

    #[test]
    fn cancelled_token_short_circuits_every_operation() {
        let store = Store::new();
        let cancel = token();
        cancel.cancel();
        let err = store.create(job(), &cancel).unwrap_err();
        assert!(matches!(err, JobError::Cancelled));
    }

    #[test]
    fn operations_on_unknown_id_are_not_found() {
        let store = Store::new();
        let cancel = token();
        let err = store.claim("does-not-exist", &cancel).unwrap_err();
        assert!(matches!(err, JobError::NotFound));
    }
}
