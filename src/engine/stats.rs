//! Executor counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Lock-free counters updated by submitters and the batch worker
#[derive(Debug, Default)]
pub struct ExecutorStats {
    submitted: AtomicU64,
    rejected: AtomicU64,
    batches: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    largest_batch: AtomicUsize,
}

/// Point-in-time copy of [`ExecutorStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub rejected: u64,
    pub batches: u64,
    pub completed: u64,
    pub failed: u64,
    pub largest_batch: usize,
}

impl ExecutorStats {
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self, size: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.largest_batch.fetch_max(size, Ordering::Relaxed);
    }

    pub fn record_completed(&self, n: usize) {
        self.completed.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_failed(&self, n: usize) {
        self.failed.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            largest_batch: self.largest_batch.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_tracks_largest_batch() {
        let stats = ExecutorStats::default();
        stats.record_batch(3);
        stats.record_batch(1);
        stats.record_completed(3);
        stats.record_failed(1);

        let snap = stats.snapshot();
        assert_eq!(snap.batches, 2);
        assert_eq!(snap.largest_batch, 3);
        assert_eq!(snap.completed, 3);
        assert_eq!(snap.failed, 1);
    }
}
