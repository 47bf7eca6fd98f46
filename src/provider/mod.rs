//! Disbursement provider integration
//!
//! Every provider call returns a [`ProviderResult`]; transport failures and non-2xx
//! responses are translated into a [`ProviderError`] at this boundary.

pub mod http;
pub mod rate_limit;
pub mod types;

pub use http::HttpDisbursementProvider;
pub use rate_limit::ProviderRateLimiter;
pub use types::*;

/// Failure reported by the disbursement provider or the transport to it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    /// Provider's detail text, or a generic/transport message
    pub message: String,
    /// HTTP status code, absent for transport failures
    pub code: Option<u16>,
}

impl ProviderError {
    /// Failure before a response was received
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Non-2xx response, with the provider's first error detail if it sent one
    pub fn http(status: u16, detail: Option<String>) -> Self {
        let message = detail
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Provider request failed with status {}", status));
        Self {
            message,
            code: Some(status),
        }
    }

    /// Whether retrying can never succeed (account suspended, payout refused)
    pub fn is_fatal(&self) -> bool {
        matches!(self.code, Some(403) | Some(422))
    }
}

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;
