//! Dispatcher - stream listener that fans statuses out to work queues

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use contracts::{Status, StreamListener, WorkerKind, RATE_LIMIT_CODE};

use crate::error::DispatcherError;
use crate::queue::{QueueRegistry, StatusQueue};

/// Builder for creating a Dispatcher
#[derive(Default)]
pub struct DispatcherBuilder {
    targets: Vec<Arc<dyn StatusQueue>>,
}

impl DispatcherBuilder {
    /// Create a builder with no targets
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a target; dispatch follows registration order
    pub fn target(mut self, queue: Arc<dyn StatusQueue>) -> Self {
        self.targets.push(queue);
        self
    }

    /// Append the registry's queue for each kind, in the given order
    pub fn targets_from(
        mut self,
        registry: &QueueRegistry,
        kinds: &[WorkerKind],
    ) -> Result<Self, DispatcherError> {
        for &kind in kinds {
            let queue = registry
                .get(kind)
                .ok_or(DispatcherError::Unregistered { kind })?;
            self.targets.push(queue);
        }
        Ok(self)
    }

    /// Build the dispatcher
    pub fn build(self) -> Dispatcher {
        info!(
            targets = ?self.targets.iter().map(|t| t.kind()).collect::<Vec<_>>(),
            "Dispatcher configured"
        );
        Dispatcher {
            targets: self.targets,
            stats: DispatchCounters::default(),
        }
    }
}

#[derive(Debug, Default)]
struct DispatchCounters {
    received: AtomicU64,
    enqueued: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of dispatch counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    /// Statuses received from the feed
    pub received: u64,
    /// Successful queue pushes (one per target per status)
    pub enqueued: u64,
    /// Queue pushes that failed
    pub failed: u64,
}

/// Fans every received status out to the registered work queues
pub struct Dispatcher {
    targets: Vec<Arc<dyn StatusQueue>>,
    stats: DispatchCounters,
}

impl Dispatcher {
    /// Dispatcher over the registry's queues for `kinds`, in that order
    pub fn from_registry(
        registry: &QueueRegistry,
        kinds: &[WorkerKind],
    ) -> Result<Self, DispatcherError> {
        Ok(DispatcherBuilder::new()
            .targets_from(registry, kinds)?
            .build())
    }

    /// Registered kinds, in dispatch order
    pub fn kinds(&self) -> Vec<WorkerKind> {
        self.targets.iter().map(|t| t.kind()).collect()
    }

    /// Current counters
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            received: self.stats.received.load(Ordering::Relaxed),
            enqueued: self.stats.enqueued.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }

    /// Enqueue `status` once on every target, in registration order.
    ///
    /// A failing target does not stop the others. Returns the number of
    /// targets that accepted the status.
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, status),
        fields(status_id = status.id)
    )]
    pub fn dispatch(&self, status: Status) -> usize {
        let status = Arc::new(status);
        let mut accepted = 0;
        for target in &self.targets {
            match target.enqueue_status(Arc::clone(&status)) {
                Ok(()) => {
                    accepted += 1;
                    self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                    debug!(kind = %target.kind(), "Enqueued status");
                }
                Err(e) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(kind = %target.kind(), error = %e, "Failed to enqueue status");
                }
            }
        }
        accepted
    }
}

impl StreamListener for Dispatcher {
    fn on_connect(&self) {
        info!("Listener connected");
    }

    fn on_status(&self, status: Status) {
        let received = self.stats.received.fetch_add(1, Ordering::Relaxed) + 1;
        info!(status_id = status.id, received, "Received status");
        self.dispatch(status);
    }

    fn on_direct_message(&self, payload: &Value) {
        info!(?payload, "Got direct message");
    }

    fn on_limit(&self, payload: &Value) {
        warn!(?payload, "Got limit message");
    }

    fn on_timeout(&self) {
        warn!("Stream timeout");
    }

    fn on_error(&self, code: u16) -> Option<bool> {
        error!(code, "Got error code");
        if code == RATE_LIMIT_CODE {
            warn!("Rate limited by upstream, disconnecting");
            return Some(false);
        }
        None
    }
}
