//! Worker metrics for observability

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Metrics for a single worker
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    /// Statuses fully handled (including those that failed validation)
    processed_count: AtomicU64,
    /// Statuses whose processing raised an error
    failure_count: AtomicU64,
    /// Id of the status currently being handled (0 = idle)
    current_status: AtomicU64,
    /// Run loop has exited
    finished: AtomicBool,
}

impl WorkerMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get processed count
    pub fn processed_count(&self) -> u64 {
        self.processed_count.load(Ordering::Relaxed)
    }

    /// Increment processed count
    pub fn inc_processed_count(&self) {
        self.processed_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Status being processed right now, if any
    pub fn current_status(&self) -> Option<u64> {
        match self.current_status.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }

    /// Record the status being processed (`None` when idle)
    pub fn set_current_status(&self, id: Option<u64>) {
        self.current_status
            .store(id.unwrap_or_default(), Ordering::Relaxed);
    }

    /// Whether the run loop has exited
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Mark the run loop as exited
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed_count: self.processed_count(),
            failure_count: self.failure_count(),
            current_status: self.current_status(),
            finished: self.is_finished(),
        }
    }
}

/// Snapshot of worker metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub processed_count: u64,
    pub failure_count: u64,
    pub current_status: Option<u64>,
    pub finished: bool,
}
