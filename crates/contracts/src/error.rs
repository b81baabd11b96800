//! Layered error definitions
//!
//! Categorized by source: config / remote api / media fetch / io

use thiserror::Error;

/// HTTP-style status code the upstream uses to signal rate limiting.
pub const RATE_LIMIT_CODE: u16 = 429;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Remote API Errors =====
    /// Remote posting API rejected the request
    #[error("remote api rejected request (code {code}): {message}")]
    RemoteApi { code: u16, message: String },

    /// Remote posting API is rate limiting us
    #[error("remote api rate limit exceeded: {message}")]
    RateLimited { message: String },

    // ===== Media Errors =====
    /// Fetching a media URL failed
    #[error("failed to fetch '{url}': {message}")]
    MediaFetch { url: String, message: String },

    // ===== Payload Errors =====
    /// Raw feed payload could not be turned into a status
    #[error("payload parse error: {message}")]
    PayloadParse { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create remote API error, mapping the rate-limit code onto `RateLimited`
    pub fn remote_api(code: u16, message: impl Into<String>) -> Self {
        if code == RATE_LIMIT_CODE {
            Self::RateLimited {
                message: message.into(),
            }
        } else {
            Self::RemoteApi {
                code,
                message: message.into(),
            }
        }
    }

    /// Create media fetch error
    pub fn media_fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MediaFetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create payload parse error
    pub fn payload_parse(message: impl Into<String>) -> Self {
        Self::PayloadParse {
            message: message.into(),
        }
    }

    /// Whether this error came from the remote side and could succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::RemoteApi { .. } | Self::MediaFetch { .. }
        )
    }
}
