//! FeedDriver - turns feed events into listener callbacks

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use contracts::{Status, StreamListener};

use crate::error::Result;
use crate::source::{FeedEvent, FeedSource};
use crate::subscription::Subscription;

/// Why the driver returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// The source ran out of events
    #[default]
    Exhausted,
    /// The listener asked to disconnect after an error code
    Disconnected { code: u16 },
    /// `max_statuses` statuses were delivered
    MaxStatuses,
}

/// Counters for one driver run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Payloads read from the source
    pub payloads: u64,
    /// Statuses handed to the listener
    pub statuses: u64,
    /// Payloads that parsed to a status without an id
    pub empty: u64,
    /// Statuses outside the subscription
    pub filtered: u64,
    /// Payloads that were not a valid status
    pub invalid: u64,
    /// Limit notices
    pub limits: u64,
    /// Direct messages
    pub direct_messages: u64,
    /// Timeouts
    pub timeouts: u64,
    /// Error codes
    pub errors: u64,
    /// How the run ended
    pub stop_reason: StopReason,
}

/// Drives a [`FeedSource`] into a [`StreamListener`]
#[derive(Debug, Clone, Default)]
pub struct FeedDriver {
    subscription: Subscription,
    max_statuses: Option<u64>,
}

impl FeedDriver {
    /// Driver with no subscription filter and no cap
    pub fn new() -> Self {
        Self::default()
    }

    /// Only deliver statuses admitted by `subscription`
    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscription = subscription;
        self
    }

    /// Stop after delivering `max` statuses; `Some(0)` means no cap
    pub fn with_max_statuses(mut self, max: Option<u64>) -> Self {
        self.max_statuses = max.filter(|&max| max > 0);
        self
    }

    /// Pull events until the source ends, the listener disconnects, or the
    /// status cap is reached.
    #[instrument(
        name = "feed_driver_run",
        skip(self, source, listener),
        fields(max_statuses = ?self.max_statuses)
    )]
    pub async fn run<S: FeedSource>(
        &self,
        source: &mut S,
        listener: &dyn StreamListener,
    ) -> Result<FeedStats> {
        let mut stats = FeedStats::default();
        info!(subscribed = !self.subscription.is_empty(), "Feed driver started");

        while let Some(event) = source.next_event().await? {
            match event {
                FeedEvent::Connected => listener.on_connect(),
                FeedEvent::Timeout => {
                    stats.timeouts += 1;
                    listener.on_timeout();
                }
                FeedEvent::Error(code) => {
                    stats.errors += 1;
                    if listener.on_error(code) == Some(false) {
                        stats.stop_reason = StopReason::Disconnected { code };
                        break;
                    }
                }
                FeedEvent::Payload(payload) => {
                    stats.payloads += 1;
                    self.deliver(&payload, listener, &mut stats);
                    if self.max_statuses.is_some_and(|max| stats.statuses >= max) {
                        stats.stop_reason = StopReason::MaxStatuses;
                        break;
                    }
                }
            }
        }

        info!(
            statuses = stats.statuses,
            payloads = stats.payloads,
            reason = ?stats.stop_reason,
            "Feed driver stopped"
        );
        Ok(stats)
    }

    fn deliver(&self, payload: &Value, listener: &dyn StreamListener, stats: &mut FeedStats) {
        if payload.get("limit").is_some() {
            stats.limits += 1;
            listener.on_limit(payload);
            return;
        }
        if payload.get("direct_message").is_some() {
            stats.direct_messages += 1;
            listener.on_direct_message(payload);
            return;
        }

        let status = match Status::from_feed_json(payload) {
            Ok(status) => status,
            Err(e) => {
                stats.invalid += 1;
                warn!(error = %e, "Dropping unparseable payload");
                return;
            }
        };

        if status.id == 0 {
            stats.empty += 1;
            debug!("Got empty status");
            return;
        }
        if !self.subscription.admits(&status) {
            stats.filtered += 1;
            debug!(status_id = status.id, "Status outside subscription");
            return;
        }

        stats.statuses += 1;
        listener.on_status(status);
    }
}
