//! # Dispatcher
//!
//! Status pipeline core.
//!
//! Responsibilities:
//! - one shared work queue per worker kind, held in an explicit registry
//! - fan-out of every received status to the registered queues
//! - worker pools draining the queues through Writer / Mirror / MediaDownloader
//! - per-worker validation chains, dry run and drain limits

pub mod dispatcher;
pub mod encoding;
pub mod error;
pub mod filters;
pub mod format;
pub mod metrics;
pub mod pool;
pub mod processor;
pub mod processors;
pub mod queue;
pub mod validation;
pub mod worker;

pub use contracts::{Status, StreamListener, WorkerKind};
pub use dispatcher::{DispatchStats, Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, WorkerMetrics};
pub use pool::WorkerPool;
pub use processor::{default_filter_of, ProcessContext, StatusProcessor};
pub use processors::{
    download_media, mirror, read_status_file, MediaDownloadProcessor, MirrorProcessor,
    WriterProcessor, DEFAULT_MEDIA_FORMAT, DEFAULT_STATUS_FORMAT,
};
pub use queue::{QueueItem, QueueRegistry, StatusQueue, WorkQueue};
pub use validation::{validate_status, Filter, FilterChain};
pub use worker::{Worker, WorkerExit, WorkerHandle, WorkerOptions};
