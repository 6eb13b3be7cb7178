//! Typed responses.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Status code plus an optionally decoded JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    /// HTTP status returned by the server.
    pub status: StatusCode,
    /// The decoded body, when one was expected and could be decoded.
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the server refused the signature.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Decode a raw response.
    ///
    /// - `400` with a non-empty body is decoded, so validation errors reach
    ///   the caller.
    /// - Any other non-2xx status yields `None`.
    /// - An empty body yields `None`.
    /// - A body that does not decode as `T` yields `None`.
    pub fn from_raw(status: StatusCode, bytes: &[u8]) -> Self {
        let decodable = status == StatusCode::BAD_REQUEST || status.is_success();
        let body = if decodable && !bytes.is_empty() {
            serde_json::from_slice(bytes)
                .map_err(|err| {
                    tracing::debug!(%status, error = %err, "response body did not decode");
                })
                .ok()
        } else {
            None
        };
        Self { status, body }
    }
}
