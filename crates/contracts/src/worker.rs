//! Worker identity and run-loop limits

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Worker type
///
/// Queues are scoped to a kind: every worker of one kind drains the same queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// Persists statuses as JSON files
    Writer,
    /// Re-posts statuses through the remote API
    Mirror,
    /// Downloads attached media
    MediaDownloader,
}

impl WorkerKind {
    /// All kinds, in a stable order
    pub const ALL: [WorkerKind; 3] = [Self::Writer, Self::Mirror, Self::MediaDownloader];

    /// Configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Writer => "writer",
            Self::Mirror => "mirror",
            Self::MediaDownloader => "media_downloader",
        }
    }

    /// Prefix used when naming pooled worker tasks
    pub fn task_prefix(&self) -> &'static str {
        match self {
            Self::Writer => "WT",
            Self::Mirror => "MT",
            Self::MediaDownloader => "DT",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum number of items a worker drains before it exits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainLimit {
    /// Drain until stopped
    #[default]
    Unbounded,
    /// Exit after this many processed items
    Limited(NonZeroU64),
}

impl DrainLimit {
    /// Build a limit from an optional count.
    ///
    /// `None` is unbounded; `Some(0)` is rejected.
    pub fn new(limit: Option<u64>) -> Result<Self, ContractError> {
        match limit {
            None => Ok(Self::Unbounded),
            Some(n) => NonZeroU64::new(n).map(Self::Limited).ok_or_else(|| {
                ContractError::config_validation("drain_limit", "drain_limit must be > 0")
            }),
        }
    }

    /// Whether a worker that has completed `done` items may dequeue again
    pub fn allows(&self, done: u64) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Limited(max) => done < max.get(),
        }
    }

    /// The finite limit, if any
    pub fn get(&self) -> Option<u64> {
        match self {
            Self::Unbounded => None,
            Self::Limited(max) => Some(max.get()),
        }
    }
}

impl TryFrom<Option<u64>> for DrainLimit {
    type Error = ContractError;

    fn try_from(value: Option<u64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
