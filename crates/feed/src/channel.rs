//! In-memory feed for programmatic injection

use async_channel::{Receiver, Sender};
use serde_json::Value;

use contracts::Status;

use crate::error::{FeedError, Result};
use crate::source::{FeedEvent, FeedSource};

/// Feed backed by an unbounded channel; ends once every sender is dropped
pub struct ChannelFeed {
    rx: Receiver<FeedEvent>,
}

/// Sending half of a [`ChannelFeed`]
#[derive(Clone)]
pub struct FeedSender {
    tx: Sender<FeedEvent>,
}

impl ChannelFeed {
    /// Create a connected sender/feed pair
    pub fn new() -> (FeedSender, ChannelFeed) {
        let (tx, rx) = async_channel::unbounded();
        (FeedSender { tx }, ChannelFeed { rx })
    }
}

impl FeedSource for ChannelFeed {
    async fn next_event(&mut self) -> Result<Option<FeedEvent>> {
        Ok(self.rx.recv().await.ok())
    }
}

impl FeedSender {
    /// Push any event
    pub fn send(&self, event: FeedEvent) -> Result<()> {
        self.tx
            .try_send(event)
            .map_err(|_| FeedError::ChannelClosed)
    }

    /// Push a raw payload
    pub fn payload(&self, payload: Value) -> Result<()> {
        self.send(FeedEvent::Payload(payload))
    }

    /// Push a status in its field-mapping form
    pub fn status(&self, status: &Status) -> Result<()> {
        self.payload(Value::Object(status.as_dict()))
    }

    /// Push a connect notice
    pub fn connect(&self) -> Result<()> {
        self.send(FeedEvent::Connected)
    }

    /// Push a timeout notice
    pub fn timeout(&self) -> Result<()> {
        self.send(FeedEvent::Timeout)
    }

    /// Push an upstream error code
    pub fn error(&self, code: u16) -> Result<()> {
        self.send(FeedEvent::Error(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_feed_ends_when_senders_drop() {
        let (tx, mut feed) = ChannelFeed::new();
        tx.connect().unwrap();
        tx.status(&Status {
            id: 3,
            ..Default::default()
        })
        .unwrap();
        drop(tx);

        assert_eq!(feed.next_event().await.unwrap(), Some(FeedEvent::Connected));
        match feed.next_event().await.unwrap() {
            Some(FeedEvent::Payload(v)) => assert_eq!(v["id"], 3),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(feed.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_send_after_feed_dropped() {
        let (tx, feed) = ChannelFeed::new();
        drop(feed);
        assert!(matches!(tx.timeout(), Err(FeedError::ChannelClosed)));
    }
}
