//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

use contracts::{ContractError, WorkerKind};

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// Feed could not be opened or read
    #[error("Feed failed: {0}")]
    Feed(#[from] feed::FeedError),

    /// Queue, pool or processor setup failed
    #[error("Dispatcher setup failed: {0}")]
    Dispatcher(#[from] dispatcher::DispatcherError),

    /// HTTP client could not be built
    #[error("Client setup failed: {0}")]
    Client(#[from] clients::ClientError),

    /// Workers of a pool exited with an error
    #[error("{count} '{kind}' worker(s) faulted, first: {first}")]
    WorkerFaults {
        kind: WorkerKind,
        count: usize,
        first: String,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn worker_faults(kind: WorkerKind, count: usize, first: impl Into<String>) -> Self {
        Self::WorkerFaults {
            kind,
            count,
            first: first.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
