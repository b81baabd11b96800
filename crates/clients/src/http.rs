//! HTTP media fetcher

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument};

use contracts::{ContractError, HttpConfig, MediaFetcher};

use crate::error::Result;

/// User agent sent when the configuration names none
pub const DEFAULT_USER_AGENT: &str = concat!("twitstream/", env!("CARGO_PKG_VERSION"));

/// `MediaFetcher` over a shared reqwest client
///
/// A single GET per call, no retry. Non-success statuses are errors.
#[derive(Debug, Clone)]
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    /// Build a fetcher with the configured timeout and user agent
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl MediaFetcher for HttpMediaFetcher {
    #[instrument(name = "http_media_get", skip(self, url), fields(url = %url))]
    async fn get(&self, url: &str) -> std::result::Result<Bytes, ContractError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ContractError::media_fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContractError::media_fetch(url, status.to_string()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ContractError::media_fetch(url, e.to_string()))?;
        debug!(bytes = body.len(), "Fetched media");
        Ok(body)
    }
}
