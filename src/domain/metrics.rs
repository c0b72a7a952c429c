//! The counter sink: four monotonic counters and one gauge, behind one lock.

use std::sync::Mutex;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_created: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_retried: u64,
    pub jobs_in_progress: u64,
}

#[derive(Debug, Default)]
struct Counters {
    jobs_created: u64,
    jobs_completed: u64,
    jobs_failed: u64,
    jobs_retried: u64,
    jobs_in_progress: u64,
}

/// Operational counters, updated at lifecycle edges by whichever component
/// owns the transition. Every operation is a single bounded critical
/// section; `snapshot` returns a by-value copy so readers can never
/// observe or mutate internal state.
#[derive(Debug, Default)]
pub struct Metrics {
    inner: Mutex<Counters>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_created(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).jobs_created += 1;
    }

    pub fn incr_completed(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).jobs_completed += 1;
    }

    pub fn incr_failed(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).jobs_failed += 1;
    }

    pub fn incr_retried(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).jobs_retried += 1;
    }

    /// Undoes a `jobs_created` increment (ingress rollback on a full queue).
    pub fn decr_created(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.jobs_created = guard.jobs_created.saturating_sub(1);
    }

    pub fn gauge_in_progress_incr(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).jobs_in_progress += 1;
    }

    pub fn gauge_in_progress_decr(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.jobs_in_progress = guard.jobs_in_progress.saturating_sub(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        MetricsSnapshot {
            jobs_created: guard.jobs_created,
            jobs_completed: guard.jobs_completed,
            jobs_failed: guard.jobs_failed,
            jobs_retried: guard.jobs_retried,
            jobs_in_progress: guard.jobs_in_progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let m = Metrics::new();
        m.incr_created();
        m.incr_created();
        m.gauge_in_progress_incr();
        let snap = m.snapshot();
        assert_eq!(snap.jobs_created, 2);
        assert_eq!(snap.jobs_in_progress, 1);
    }

    #[test]
    fn rollback_decrements_created() {
        let m = Metrics::new();
        m.incr_created();
        m.decr_created();
        assert_eq!(m.snapshot().jobs_created, 0);
    }

    #[test]
    fn gauge_never_underflows() {
        let m = Metrics::new();
        m.gauge_in_progress_decr();
        assert_eq!(m.snapshot().jobs_in_progress, 0);
    }
}
