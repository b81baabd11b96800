//! Work queues - one shared FIFO per worker kind
//!
//! Every worker of a kind drains the same queue, so enqueueing targets the
//! kind rather than an instance. Queues are unbounded: the dispatcher never
//! waits on a slow pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use tokio::sync::Notify;
use tracing::warn;

use contracts::{Status, WorkerKind};

use crate::error::DispatcherError;

/// One queue entry
#[derive(Debug, Clone)]
pub enum QueueItem {
    /// A status to process
    Status(Arc<Status>),
    /// Poison sentinel: the worker that dequeues it stops
    Stop,
}

/// Enqueue side of a work queue, as seen by the dispatcher
pub trait StatusQueue: Send + Sync {
    /// Kind of worker draining this queue
    fn kind(&self) -> WorkerKind;

    /// Push a status without waiting on consumers
    fn enqueue_status(&self, status: Arc<Status>) -> Result<(), DispatcherError>;
}

/// Unbounded MPMC queue with outstanding-work accounting
#[derive(Debug)]
pub struct WorkQueue {
    kind: WorkerKind,
    tx: Sender<QueueItem>,
    rx: Receiver<QueueItem>,
    /// Items enqueued but not yet acknowledged with `task_done`
    unfinished: AtomicUsize,
    idle: Notify,
}

impl WorkQueue {
    /// Create an empty queue for `kind`
    pub fn new(kind: WorkerKind) -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self {
            kind,
            tx,
            rx,
            unfinished: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    /// Worker kind this queue belongs to
    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Push an item. Never waits: the queue has no capacity bound.
    pub fn enqueue(&self, item: QueueItem) -> Result<(), DispatcherError> {
        self.unfinished.fetch_add(1, Ordering::AcqRel);
        if self.tx.try_send(item).is_err() {
            self.task_done();
            return Err(DispatcherError::QueueClosed { kind: self.kind });
        }
        Ok(())
    }

    /// Pop the next item, waiting as long as it takes
    pub async fn dequeue(&self) -> Result<QueueItem, DispatcherError> {
        self.rx
            .recv()
            .await
            .map_err(|_| DispatcherError::QueueClosed { kind: self.kind })
    }

    /// Acknowledge that a dequeued item has been fully handled
    pub fn task_done(&self) {
        let previous = self
            .unfinished
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match previous {
            Ok(1) => self.idle.notify_waiters(),
            Ok(_) => {}
            Err(_) => warn!(kind = %self.kind, "task_done called more times than items enqueued"),
        }
    }

    /// Items enqueued but not yet acknowledged
    pub fn unfinished(&self) -> usize {
        self.unfinished.load(Ordering::Acquire)
    }

    /// Items waiting to be dequeued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no item is waiting to be dequeued
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Wait until every enqueued item has been acknowledged
    pub async fn join(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Enqueue `n` poison items, stopping `n` workers
    pub fn stop(&self, n: usize) -> Result<(), DispatcherError> {
        for _ in 0..n {
            self.enqueue(QueueItem::Stop)?;
        }
        Ok(())
    }
}

impl StatusQueue for WorkQueue {
    fn kind(&self) -> WorkerKind {
        self.kind
    }

    fn enqueue_status(&self, status: Arc<Status>) -> Result<(), DispatcherError> {
        self.enqueue(QueueItem::Status(status))
    }
}

/// Explicit `WorkerKind -> queue` map, injected into workers and the dispatcher
#[derive(Debug, Clone, Default)]
pub struct QueueRegistry {
    queues: HashMap<WorkerKind, Arc<WorkQueue>>,
}

impl QueueRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue for `kind`, created on first use
    pub fn register(&mut self, kind: WorkerKind) -> Arc<WorkQueue> {
        Arc::clone(
            self.queues
                .entry(kind)
                .or_insert_with(|| Arc::new(WorkQueue::new(kind))),
        )
    }

    /// Queue for `kind`, if registered
    pub fn get(&self, kind: WorkerKind) -> Option<Arc<WorkQueue>> {
        self.queues.get(&kind).cloned()
    }

    /// Registered kinds
    pub fn kinds(&self) -> Vec<WorkerKind> {
        let mut kinds: Vec<_> = self.queues.keys().copied().collect();
        kinds.sort();
        kinds
    }
}
