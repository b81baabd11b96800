//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Flow
//! - `feed` turns raw upstream events into [`Status`] values and drives a [`StreamListener`]
//! - the dispatcher fans each status out to one queue per [`WorkerKind`]
//! - workers reach the outside world only through [`StatusApi`] and [`MediaFetcher`]

mod api;
mod blueprint;
mod error;
mod listener;
mod status;
mod worker;

pub use api::*;
pub use blueprint::*;
pub use error::*;
pub use listener::StreamListener;
pub use status::*;
pub use worker::*;
