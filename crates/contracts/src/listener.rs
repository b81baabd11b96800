//! StreamListener trait - feed driver callback interface
//!
//! The feed driver calls these on its own task, one payload at a time.

use serde_json::Value;

use crate::Status;

/// Callbacks invoked by the upstream feed driver
pub trait StreamListener: Send + Sync {
    /// Connection to the feed established
    fn on_connect(&self);

    /// A status arrived
    fn on_status(&self, status: Status);

    /// A direct message arrived
    fn on_direct_message(&self, payload: &Value);

    /// The feed reported undelivered statuses because of a track limit
    fn on_limit(&self, payload: &Value);

    /// The feed connection timed out
    fn on_timeout(&self);

    /// The feed reported an error code
    ///
    /// Returning `Some(false)` asks the driver to disconnect. `None` (or
    /// `Some(true)`) means keep going.
    fn on_error(&self, code: u16) -> Option<bool>;
}
