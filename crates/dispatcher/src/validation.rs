//! Validation chain
//!
//! A chain is an ordered list of named predicates. Every predicate runs,
//! even after one has failed, so the log names all failing criteria.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use contracts::Status;

type Predicate = dyn Fn(&Status) -> bool + Send + Sync;

/// Named status predicate
#[derive(Clone)]
pub struct Filter {
    name: String,
    predicate: Arc<Predicate>,
}

impl Filter {
    /// Wrap a predicate under a diagnostic name
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Status) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate against a status
    pub fn check(&self, status: &Status) -> bool {
        (self.predicate)(status)
    }

    /// Logical negation, named `not(<name>)`
    pub fn negate(self) -> Self {
        let name = format!("not({})", self.name);
        Self::new(name, move |status| !self.check(status))
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.name).finish()
    }
}

/// Ordered predicate list owned by one worker
pub type FilterChain = Vec<Filter>;

/// Run every filter against `status`; valid iff none failed.
///
/// An empty chain validates as true.
pub fn validate_status(status: &Status, filters: &[Filter]) -> bool {
    let failures: Vec<&str> = filters
        .iter()
        .filter(|f| !f.check(status))
        .map(Filter::name)
        .collect();

    if failures.is_empty() {
        debug!(status_id = status.id, "Status passed validation");
        true
    } else {
        debug!(
            status_id = status.id,
            failed = failures.len(),
            filters = ?failures,
            "Status failed filter criteria"
        );
        false
    }
}
