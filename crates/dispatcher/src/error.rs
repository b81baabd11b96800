//! Dispatcher error types

use contracts::WorkerKind;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Every receiver of a work queue is gone
    #[error("work queue for '{kind}' is closed")]
    QueueClosed { kind: WorkerKind },

    /// Dispatch target requested for a kind with no queue
    #[error("no work queue registered for '{kind}'")]
    Unregistered { kind: WorkerKind },

    /// A worker was attached to a queue of another kind
    #[error("worker '{worker}' of kind '{expected}' cannot drain the '{actual}' queue")]
    QueueMismatch {
        worker: String,
        expected: WorkerKind,
        actual: WorkerKind,
    },

    /// Filename template could not be rendered
    #[error("cannot render template '{template}': {message}")]
    Template { template: String, message: String },

    /// Processing routine that a worker kind does not provide
    #[error("{operation} is not implemented for '{kind}' workers")]
    Unimplemented {
        kind: WorkerKind,
        operation: &'static str,
    },

    /// Worker task was cancelled before it finished
    #[error("worker '{worker}' was cancelled")]
    Cancelled { worker: String },

    /// Remote API or media fetch error (from contract)
    #[error("collaborator error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// JSON encode / decode error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a template error
    pub fn template(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Create an unimplemented-operation error
    pub fn unimplemented(kind: WorkerKind, operation: &'static str) -> Self {
        Self::Unimplemented { kind, operation }
    }

    /// Whether retrying later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Contract(e) => e.is_transient(),
            _ => false,
        }
    }
}
