//! Client error types

use contracts::ContractError;
use thiserror::Error;

/// Client construction errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP client could not be built
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Result alias
pub type Result<T> = std::result::Result<T, ClientError>;
