//! External collaborator traits
//!
//! The core calls out through these; concrete clients live in the `clients` crate.

use std::path::PathBuf;

use bytes::Bytes;

use crate::{ContractError, Status};

/// Authenticated remote posting API
#[trait_variant::make(StatusApi: Send)]
pub trait LocalStatusApi {
    /// Publish a new status with the given text and local media files
    ///
    /// # Errors
    /// Faults on rate limiting or rejection instead of dropping the post.
    async fn post(&self, text: &str, media: &[PathBuf]) -> Result<Status, ContractError>;
}

/// HTTP fetch collaborator for media bytes
#[trait_variant::make(MediaFetcher: Send)]
pub trait LocalMediaFetcher {
    /// Fetch the body behind `url`
    ///
    /// # Errors
    /// No retry is attempted; transport and status failures are returned as is.
    async fn get(&self, url: &str) -> Result<Bytes, ContractError>;
}
