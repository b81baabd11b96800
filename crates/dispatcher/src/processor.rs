//! StatusProcessor trait - the per-kind processing capability
//!
//! A [`Worker`](crate::Worker) owns the queue discipline; a processor only
//! decides what one status turns into.

use std::fmt::Debug;
use std::future::Future;

use contracts::{Status, WorkerKind};

use crate::error::DispatcherError;
use crate::validation::{validate_status, Filter};

/// Per-call view of the worker running a processor
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext<'a> {
    /// Worker name, for logs
    pub worker: &'a str,
    /// Compute the action without performing the side effect
    pub dry_run: bool,
    /// The worker's validation chain
    pub filters: &'a [Filter],
}

impl ProcessContext<'_> {
    /// Run the worker's validation chain against `status`
    pub fn validate(&self, status: &Status) -> bool {
        validate_status(status, self.filters)
    }
}

/// Processing capability for one worker kind
pub trait StatusProcessor: Send + 'static {
    /// Processing result; each kind has its own "not processed" value
    type Output: Debug + Send;

    /// Kind whose queue this processor drains
    fn kind(&self) -> WorkerKind;

    /// Filter applied when the configuration names none
    fn default_filter(_status: &Status) -> bool
    where
        Self: Sized,
    {
        true
    }

    /// Handle one status
    ///
    /// # Errors
    /// Any error terminates the worker running this processor.
    fn process(
        &mut self,
        _status: &Status,
        _ctx: &ProcessContext<'_>,
    ) -> impl Future<Output = Result<Self::Output, DispatcherError>> + Send {
        let kind = self.kind();
        async move { Err(DispatcherError::unimplemented(kind, "process")) }
    }
}

/// Default filter of `P`, wrapped for a validation chain
pub fn default_filter_of<P: StatusProcessor>() -> Filter {
    Filter::new("default_filter", P::default_filter)
}
