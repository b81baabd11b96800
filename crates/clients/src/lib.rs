//! # Clients
//!
//! Concrete external collaborators for the status pipeline.
//!
//! Responsibilities:
//! - Fetch media over HTTP (`HttpMediaFetcher`)
//! - Posting backend that only logs (`LoggingStatusApi`)
//! - Recording mocks with failure injection for tests

pub mod error;
pub mod http;
pub mod logging_api;
pub mod mock;

pub use contracts::{MediaFetcher, StatusApi};
pub use error::{ClientError, Result};
pub use http::{HttpMediaFetcher, DEFAULT_USER_AGENT};
pub use logging_api::LoggingStatusApi;
pub use mock::{MockApiConfig, MockMediaFetcher, MockStatusApi, PostedStatus};
