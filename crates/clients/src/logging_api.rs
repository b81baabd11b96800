//! Posting backend that only logs

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, instrument};

use contracts::{ContractError, Status, StatusApi};

/// `StatusApi` that logs each post and returns a synthetic status
///
/// Nothing leaves the process. Ids count up from `first_id`.
#[derive(Debug)]
pub struct LoggingStatusApi {
    next_id: AtomicU64,
}

impl LoggingStatusApi {
    /// Create with ids starting at 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create with ids starting at `first_id`
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first_id),
        }
    }
}

impl Default for LoggingStatusApi {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusApi for LoggingStatusApi {
    #[instrument(name = "logging_api_post", skip(self, text, media))]
    async fn post(&self, text: &str, media: &[PathBuf]) -> Result<Status, ContractError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(id, text, ?media, "post called");
        Ok(Status {
            id,
            text: Some(text.to_string()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_post_returns_fresh_ids() {
        let api = LoggingStatusApi::starting_at(100);
        let a = api.post("one", &[]).await.unwrap();
        let b = api
            .post("two", &[PathBuf::from("/tmp/pic.png")])
            .await
            .unwrap();
        assert_eq!((a.id, b.id), (100, 101));
        assert_eq!(b.text.as_deref(), Some("two"));
    }
}
