//! Errors raised by the provider clients.

use catalog::Provider;
use thiserror::Error;

/// Longest upstream body excerpt kept in an error message
const BODY_EXCERPT_LEN: usize = 200;

/// Errors that can occur when talking to an upstream tracker
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport failure, timeout, or body read failure
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream refused the bearer token
    #[error("{provider} rejected the access token")]
    Unauthorized { provider: Provider },

    #[error("{provider} is rate limiting requests")]
    RateLimited { provider: Provider },

    /// Any other non-2xx response
    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: Provider,
        status: u16,
        body: String,
    },

    /// 2xx response whose body does not match the expected shape
    #[error("{provider} returned a malformed response: {reason}")]
    Malformed { provider: Provider, reason: String },

    /// GraphQL-level error list
    #[error("{provider} query failed: {message}")]
    Query { provider: Provider, message: String },

    /// Expected object absent from an otherwise valid response
    #[error("{provider} returned no {what}")]
    NotFound {
        provider: Provider,
        what: &'static str,
    },
}

impl ProviderError {
    /// True when the failure means the credentials are unusable
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ProviderError::Unauthorized { .. })
    }

    /// Map a non-2xx status to an error, keeping a short body excerpt
    pub(crate) fn from_status(provider: Provider, status: reqwest::StatusCode, body: &[u8]) -> Self {
        match status.as_u16() {
            401 | 403 => ProviderError::Unauthorized { provider },
            429 => ProviderError::RateLimited { provider },
            code => {
                let body: String = String::from_utf8_lossy(body)
                    .chars()
                    .take(BODY_EXCERPT_LEN)
                    .collect();
                ProviderError::Status {
                    provider,
                    status: code,
                    body,
                }
            }
        }
    }
}

/// Convenience type alias for Results in this crate
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
