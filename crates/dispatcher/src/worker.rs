//! Worker - drains one kind's queue through a processor
//!
//! Run loop:
//! - dequeue (waits indefinitely)
//! - poison item: acknowledge it and stop
//! - status: process, acknowledge, count it; an error is logged,
//!   acknowledged and returned, which ends the worker
//! - exit once `drain_limit` statuses completed normally
//!
//! Panics raised while processing are not caught; [`WorkerHandle::join`]
//! resumes them on the joining task.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use contracts::{DrainLimit, WorkerConfig, WorkerKind};

use crate::error::DispatcherError;
use crate::filters::resolve_chain;
use crate::metrics::WorkerMetrics;
use crate::processor::{default_filter_of, ProcessContext, StatusProcessor};
use crate::queue::{QueueItem, WorkQueue};
use crate::validation::FilterChain;

/// Worker configuration, validated before the worker is built
#[derive(Debug, Clone, Default)]
pub struct WorkerOptions {
    /// Maximum statuses to process before exiting
    pub drain_limit: DrainLimit,
    /// Compute actions without performing side effects
    pub dry_run: bool,
    /// Validation chain; `None` uses the processor's default filter
    pub filters: Option<FilterChain>,
}

impl WorkerOptions {
    /// Options for a worker of `P` from its pool configuration
    pub fn from_config<P: StatusProcessor>(
        config: &WorkerConfig,
        global_dry_run: bool,
    ) -> Result<Self, DispatcherError> {
        let filters = config
            .filters
            .as_deref()
            .map(|specs| resolve_chain(specs, &default_filter_of::<P>()));

        Ok(Self {
            drain_limit: config.drain_limit()?,
            dry_run: config.effective_dry_run(global_dry_run),
            filters,
        })
    }

    /// Set the drain limit; zero is rejected
    pub fn with_drain_limit(mut self, limit: Option<u64>) -> Result<Self, DispatcherError> {
        self.drain_limit = DrainLimit::new(limit)?;
        Ok(self)
    }

    /// Set dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Replace the validation chain
    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Why a worker's run loop ended normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Dequeued a poison item
    Stopped { processed: u64 },
    /// Processed `drain_limit` statuses
    DrainLimit { processed: u64 },
}

impl WorkerExit {
    /// Statuses processed before exiting
    pub fn processed(&self) -> u64 {
        match self {
            Self::Stopped { processed } | Self::DrainLimit { processed } => *processed,
        }
    }
}

/// A single consumer bound to its kind's shared queue
pub struct Worker<P: StatusProcessor> {
    name: String,
    processor: P,
    queue: Arc<WorkQueue>,
    drain_limit: DrainLimit,
    dry_run: bool,
    filters: FilterChain,
    metrics: Arc<WorkerMetrics>,
}

impl<P: StatusProcessor> Worker<P> {
    /// Create a worker draining `queue`
    ///
    /// # Errors
    /// The queue must belong to the processor's kind.
    pub fn new(
        name: impl Into<String>,
        processor: P,
        queue: Arc<WorkQueue>,
        options: WorkerOptions,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        if queue.kind() != processor.kind() {
            return Err(DispatcherError::QueueMismatch {
                worker: name,
                expected: processor.kind(),
                actual: queue.kind(),
            });
        }

        Ok(Self {
            name,
            processor,
            queue,
            drain_limit: options.drain_limit,
            dry_run: options.dry_run,
            filters: options
                .filters
                .unwrap_or_else(|| vec![default_filter_of::<P>()]),
            metrics: Arc::new(WorkerMetrics::new()),
        })
    }

    /// Worker name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Worker kind
    pub fn kind(&self) -> WorkerKind {
        self.processor.kind()
    }

    /// Validation chain
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Whether side effects are skipped
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Drain limit
    pub fn drain_limit(&self) -> DrainLimit {
        self.drain_limit
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<WorkerMetrics> {
        &self.metrics
    }

    /// Run the loop on the current task until it exits
    #[instrument(
        name = "worker_loop",
        skip(self),
        fields(worker = %self.name, kind = %self.processor.kind())
    )]
    pub async fn run(mut self) -> Result<WorkerExit, DispatcherError> {
        let _finished = FinishGuard(Arc::clone(&self.metrics));
        debug!("Worker started");

        let mut processed: u64 = 0;
        while self.drain_limit.allows(processed) {
            let status = match self.queue.dequeue().await? {
                QueueItem::Stop => {
                    debug!(processed, "Stopping worker");
                    self.queue.task_done();
                    return Ok(WorkerExit::Stopped { processed });
                }
                QueueItem::Status(status) => status,
            };
            let ack = AckGuard(&self.queue);

            self.metrics.set_current_status(Some(status.id));
            let ctx = ProcessContext {
                worker: &self.name,
                dry_run: self.dry_run,
                filters: &self.filters,
            };
            let result = self.processor.process(&status, &ctx).await;
            self.metrics.set_current_status(None);

            match result {
                Ok(output) => {
                    processed += 1;
                    self.metrics.inc_processed_count();
                    drop(ack);
                    debug!(status_id = status.id, ?output, "Worker finished job");
                }
                Err(e) => {
                    self.metrics.inc_failure_count();
                    drop(ack);
                    error!(
                        status_id = status.id,
                        error = %e,
                        status = ?status,
                        "Processing failed, worker terminating"
                    );
                    return Err(e);
                }
            }
        }

        debug!(processed, "Drain limit reached");
        Ok(WorkerExit::DrainLimit { processed })
    }

    /// Spawn the loop as a tokio task
    pub fn spawn(self) -> WorkerHandle {
        let name = self.name.clone();
        let kind = self.kind();
        let metrics = Arc::clone(&self.metrics);
        let handle = tokio::spawn(self.run());

        WorkerHandle {
            name,
            kind,
            metrics,
            handle,
        }
    }
}

/// Marks the worker finished however the loop exits
struct FinishGuard(Arc<WorkerMetrics>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.mark_finished();
    }
}

/// Acknowledges the dequeued item on drop, unwinding included
struct AckGuard<'a>(&'a WorkQueue);

impl Drop for AckGuard<'_> {
    fn drop(&mut self) {
        self.0.task_done();
    }
}

/// Handle to a spawned worker
///
/// The caller decides between [`join`](Self::join) and
/// [`detach`](Self::detach); dropping the handle detaches.
pub struct WorkerHandle {
    name: String,
    kind: WorkerKind,
    metrics: Arc<WorkerMetrics>,
    handle: JoinHandle<Result<WorkerExit, DispatcherError>>,
}

impl WorkerHandle {
    /// Worker name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Worker kind
    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<WorkerMetrics> {
        &self.metrics
    }

    /// Whether the run loop has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to exit
    ///
    /// A panic inside the worker is resumed on the caller.
    pub async fn join(self) -> Result<WorkerExit, DispatcherError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(DispatcherError::Cancelled { worker: self.name }),
        }
    }

    /// Let the worker run on without waiting for it
    pub fn detach(self) {
        debug!(worker = %self.name, "Worker detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Filter;
    use contracts::Status;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<u64>>>,
        fail_on: Option<u64>,
        panic_on: Option<u64>,
    }

    impl StatusProcessor for Recorder {
        type Output = Option<u64>;

        fn kind(&self) -> WorkerKind {
            WorkerKind::Writer
        }

        fn default_filter(status: &Status) -> bool {
            status.id % 2 == 1
        }

        async fn process(
            &mut self,
            status: &Status,
            ctx: &ProcessContext<'_>,
        ) -> Result<Self::Output, DispatcherError> {
            self.seen.lock().unwrap().push(status.id);
            if self.panic_on == Some(status.id) {
                panic!("boom");
            }
            if self.fail_on == Some(status.id) {
                return Err(contracts::ContractError::remote_api(429, "slow down").into());
            }
            Ok(ctx.validate(status).then_some(status.id))
        }
    }

    /// Uses the unimplemented default `process`
    struct Bare;

    impl StatusProcessor for Bare {
        type Output = ();

        fn kind(&self) -> WorkerKind {
            WorkerKind::Mirror
        }
    }

    fn queue_with(kind: WorkerKind, ids: &[u64]) -> Arc<WorkQueue> {
        let queue = Arc::new(WorkQueue::new(kind));
        for id in ids {
            queue
                .enqueue(QueueItem::Status(Arc::new(Status {
                    id: *id,
                    ..Default::default()
                })))
                .unwrap();
        }
        queue
    }

    #[tokio::test]
    async fn test_drain_limit_stops_without_extra_dequeue() {
        let queue = queue_with(WorkerKind::Writer, &[1, 2, 3, 4]);
        let recorder = Recorder::default();
        let options = WorkerOptions::default().with_drain_limit(Some(3)).unwrap();
        let worker = Worker::new("WT-0", recorder.clone(), Arc::clone(&queue), options).unwrap();

        let exit = worker.run().await.unwrap();
        assert_eq!(exit, WorkerExit::DrainLimit { processed: 3 });
        assert_eq!(*recorder.seen.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.unfinished(), 1);
    }

    #[tokio::test]
    async fn test_poison_stops_without_processing() {
        let queue = queue_with(WorkerKind::Writer, &[]);
        queue.stop(1).unwrap();
        let recorder = Recorder::default();
        let worker = Worker::new(
            "WT-0",
            recorder.clone(),
            Arc::clone(&queue),
            WorkerOptions::default(),
        )
        .unwrap();
        let metrics = Arc::clone(worker.metrics());

        let exit = worker.run().await.unwrap();
        assert_eq!(exit, WorkerExit::Stopped { processed: 0 });
        assert!(recorder.seen.lock().unwrap().is_empty());
        assert_eq!(queue.unfinished(), 0);
        assert!(metrics.is_finished());
    }

    #[tokio::test]
    async fn test_fault_is_acknowledged_then_returned() {
        let queue = queue_with(WorkerKind::Writer, &[1, 2, 3]);
        let recorder = Recorder {
            fail_on: Some(2),
            ..Default::default()
        };
        let worker = Worker::new(
            "WT-0",
            recorder.clone(),
            Arc::clone(&queue),
            WorkerOptions::default(),
        )
        .unwrap();
        let metrics = Arc::clone(worker.metrics());

        let err = worker.run().await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(*recorder.seen.lock().unwrap(), vec![1, 2]);
        // only the untouched third status is outstanding
        assert_eq!(queue.unfinished(), 1);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.processed_count, 1);
        assert_eq!(snapshot.failure_count, 1);
        assert!(snapshot.finished);
    }

    #[tokio::test]
    async fn test_default_process_is_unimplemented() {
        let queue = queue_with(WorkerKind::Mirror, &[7]);
        let worker = Worker::new("MT-0", Bare, queue, WorkerOptions::default()).unwrap();
        let err = worker.run().await.unwrap_err();
        assert!(matches!(
            err,
            DispatcherError::Unimplemented {
                kind: WorkerKind::Mirror,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_default_filter_used_without_configured_chain() {
        let queue = queue_with(WorkerKind::Writer, &[]);
        let worker = Worker::new("WT-0", Recorder::default(), queue, WorkerOptions::default())
            .unwrap();
        let names: Vec<&str> = worker.filters().iter().map(Filter::name).collect();
        assert_eq!(names, vec!["default_filter"]);
        assert!(!worker.dry_run());
    }

    #[tokio::test]
    async fn test_options_from_config() {
        let mut config = WorkerConfig::new(WorkerKind::Writer);
        config.drain_limit = Some(5);
        config.filters = Some(vec![
            contracts::FilterSpec::Default,
            contracts::FilterSpec::HasMedia,
        ]);
        let options = WorkerOptions::from_config::<Recorder>(&config, true).unwrap();
        assert_eq!(options.drain_limit.get(), Some(5));
        assert!(options.dry_run);
        let filters = options.filters.unwrap();
        assert!(filters[0].check(&Status {
            id: 1,
            ..Default::default()
        }));
        assert_eq!(filters[1].name(), "has_media");

        config.drain_limit = Some(0);
        assert!(WorkerOptions::from_config::<Recorder>(&config, false).is_err());
    }

    #[test]
    fn test_queue_kind_mismatch() {
        let queue = Arc::new(WorkQueue::new(WorkerKind::Mirror));
        let result = Worker::new("WT-0", Recorder::default(), queue, WorkerOptions::default());
        assert!(matches!(
            result,
            Err(DispatcherError::QueueMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_spawned_worker_joins() {
        let queue = queue_with(WorkerKind::Writer, &[1, 2]);
        queue.stop(1).unwrap();
        let worker = Worker::new(
            "WT-0",
            Recorder::default(),
            Arc::clone(&queue),
            WorkerOptions::default(),
        )
        .unwrap();
        let handle = worker.spawn();
        assert_eq!(handle.name(), "WT-0");
        let exit = handle.join().await.unwrap();
        assert_eq!(exit.processed(), 2);
        queue.join().await;
    }

    #[tokio::test]
    #[should_panic(expected = "boom")]
    async fn test_panic_propagates_through_join() {
        let queue = queue_with(WorkerKind::Writer, &[1]);
        let recorder = Recorder {
            panic_on: Some(1),
            ..Default::default()
        };
        let worker = Worker::new("WT-0", recorder, queue, WorkerOptions::default()).unwrap();
        let _ = worker.spawn().join().await;
    }

    #[tokio::test]
    async fn test_panic_still_acknowledges_item() {
        let queue = queue_with(WorkerKind::Writer, &[1]);
        let recorder = Recorder {
            panic_on: Some(1),
            ..Default::default()
        };
        let worker =
            Worker::new("WT-0", recorder, Arc::clone(&queue), WorkerOptions::default()).unwrap();
        let metrics = Arc::clone(worker.metrics());

        let joined = tokio::spawn(worker.spawn().join()).await;
        assert!(joined.unwrap_err().is_panic());
        assert_eq!(queue.unfinished(), 0);
        assert!(metrics.is_finished());
        tokio::time::timeout(std::time::Duration::from_millis(500), queue.join())
            .await
            .unwrap();
    }
}
