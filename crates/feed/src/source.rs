//! 数据源 trait

use serde_json::Value;

use crate::error::Result;

/// One event from the upstream feed
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Connection established
    Connected,
    /// Raw JSON payload (status, limit notice, direct message)
    Payload(Value),
    /// Connection timed out
    Timeout,
    /// Upstream reported an error code
    Error(u16),
}

/// 上游数据源
///
/// 由 [`FeedDriver`](crate::FeedDriver) 逐个拉取事件。
#[trait_variant::make(FeedSource: Send)]
pub trait LocalFeedSource {
    /// 返回下一个事件；`None` 表示数据源已结束
    async fn next_event(&mut self) -> Result<Option<FeedEvent>>;
}
