//! Subscription allow-list

use std::collections::HashSet;

use contracts::{Status, SubscriptionConfig};

/// Which statuses the stream was opened for
///
/// An empty subscription admits everything. Otherwise a status is admitted
/// when its author is followed, or a tracked term matches one of its
/// hashtags or appears in its text (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct Subscription {
    follow: HashSet<u64>,
    track: Vec<String>,
}

impl Subscription {
    /// Build from the stream configuration
    pub fn new(config: &SubscriptionConfig) -> Self {
        Self {
            follow: config.follow.iter().copied().collect(),
            track: config
                .track
                .iter()
                .map(|t| t.trim().trim_start_matches('#').to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Whether no restriction applies
    pub fn is_empty(&self) -> bool {
        self.follow.is_empty() && self.track.is_empty()
    }

    /// Whether `status` belongs to this subscription
    pub fn admits(&self, status: &Status) -> bool {
        if self.is_empty() {
            return true;
        }
        if status.user_id().is_some_and(|id| self.follow.contains(&id)) {
            return true;
        }
        if self.track.is_empty() {
            return false;
        }

        let text = status.display_text().to_lowercase();
        self.track.iter().any(|term| {
            status
                .hashtags
                .iter()
                .any(|h| h.text.to_lowercase() == *term)
                || text.contains(term.as_str())
        })
    }
}

impl From<&SubscriptionConfig> for Subscription {
    fn from(config: &SubscriptionConfig) -> Self {
        Self::new(config)
    }
}
