//! # Feed
//!
//! Upstream status feed boundary.
//!
//! Responsibilities:
//! - Read raw payloads from a source (NDJSON file replay, stdin, in-memory channel)
//! - Classify payloads into listener callbacks (status, limit, direct message)
//! - Apply the subscription allow-list and the optional status cap
//!
//! ## Usage Example
//!
//! ```ignore
//! use feed::{FeedDriver, LineFeed};
//!
//! let mut source = LineFeed::open(path).await?;
//! let stats = FeedDriver::new()
//!     .with_max_statuses(Some(100))
//!     .run(&mut source, &dispatcher)
//!     .await?;
//! ```

mod channel;
mod driver;
mod error;
mod line;
mod source;
mod subscription;

// Re-exports
pub use channel::{ChannelFeed, FeedSender};
pub use driver::{FeedDriver, FeedStats, StopReason};
pub use error::{FeedError, Result};
pub use line::{ConfiguredFeed, LineFeed};
pub use source::{FeedEvent, FeedSource, LocalFeedSource};
pub use subscription::Subscription;
