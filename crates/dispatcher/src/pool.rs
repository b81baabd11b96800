//! WorkerPool - N competing workers over one kind's queue

use std::sync::Arc;

use tracing::{info, instrument};

use contracts::{ContractError, WorkerKind};

use crate::error::DispatcherError;
use crate::metrics::{MetricsSnapshot, WorkerMetrics};
use crate::processor::StatusProcessor;
use crate::queue::{QueueRegistry, WorkQueue};
use crate::worker::{Worker, WorkerExit, WorkerHandle, WorkerOptions};

/// Running workers of one kind
pub struct WorkerPool {
    kind: WorkerKind,
    queue: Arc<WorkQueue>,
    handles: Vec<WorkerHandle>,
}

impl WorkerPool {
    /// Spawn `size` workers, each with its own clone of `processor`,
    /// draining the kind's queue from `registry`.
    ///
    /// Workers are named `<prefix>-<i>`, e.g. `WT-0`.
    #[instrument(
        name = "worker_pool_spawn",
        skip(processor, registry, options),
        fields(kind = %processor.kind())
    )]
    pub fn spawn<P>(
        processor: P,
        size: usize,
        registry: &mut QueueRegistry,
        options: WorkerOptions,
    ) -> Result<Self, DispatcherError>
    where
        P: StatusProcessor + Clone,
    {
        let kind = processor.kind();
        if size == 0 {
            return Err(ContractError::config_validation(
                format!("{kind}.pool_size"),
                "pool_size must be > 0",
            )
            .into());
        }

        let queue = registry.register(kind);
        let mut handles = Vec::with_capacity(size);
        for i in 0..size {
            let name = format!("{}-{}", kind.task_prefix(), i);
            let worker = Worker::new(name, processor.clone(), Arc::clone(&queue), options.clone())?;
            handles.push(worker.spawn());
        }

        info!(
            size,
            dry_run = options.dry_run,
            drain_limit = ?options.drain_limit.get(),
            "Worker pool started"
        );
        Ok(Self {
            kind,
            queue,
            handles,
        })
    }

    /// Kind served by this pool
    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Shared queue
    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Number of workers spawned
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Worker names, in spawn order
    pub fn names(&self) -> Vec<&str> {
        self.handles.iter().map(WorkerHandle::name).collect()
    }

    /// Workers whose run loop has not exited
    pub fn live(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Enqueue one poison item per member
    pub fn stop(&self) -> Result<(), DispatcherError> {
        self.queue.stop(self.handles.len())
    }

    /// Wait for every member, returning the exits in spawn order
    #[instrument(name = "worker_pool_join", skip(self), fields(kind = %self.kind))]
    pub async fn join(self) -> Vec<Result<WorkerExit, DispatcherError>> {
        let mut exits = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            exits.push(handle.join().await);
        }
        info!(workers = exits.len(), "Worker pool joined");
        exits
    }

    /// Let every member run on
    pub fn detach(self) {
        info!(kind = %self.kind, workers = self.handles.len(), "Detaching worker pool");
        for handle in self.handles {
            handle.detach();
        }
    }

    /// Shared per-worker metrics, usable after the pool is joined or detached
    pub fn metric_handles(&self) -> Vec<(String, Arc<WorkerMetrics>)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect()
    }

    /// Per-worker metrics
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }
}
