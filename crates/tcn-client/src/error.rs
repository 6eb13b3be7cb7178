//! Client error types.

use tcn_auth::AuthError;
use thiserror::Error;

/// Errors returned by [`SignedClient`](crate::SignedClient).
///
/// Server rejections are not errors: they come back as an
/// [`ApiResponse`](crate::ApiResponse) with a `401` status.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be signed.
    #[error("Signing failed: {0}")]
    Auth(#[from] AuthError),

    /// The request could not be sent or the response could not be read.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The base URL or a request path does not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request body could not be serialized to JSON.
    #[error("Failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether another attempt may succeed.
    ///
    /// Only connection failures and timeouts are retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_connect() || err.is_timeout())
    }
}
