//! Client configuration.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TCN_BASE_URL` | *(required)* | Base URL all request paths are resolved against |
//! | `TCN_TIMEOUT_SECS` | `30` | Per-attempt timeout |
//! | `TCN_MAX_RETRIES` | `0` | Extra attempts after a connect failure or timeout |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::ClientError;

/// Default per-attempt timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`SignedClient`](crate::SignedClient).
///
/// # Examples
///
/// ```
/// use tcn_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://api.example.com/".to_owned())
///     .build();
/// assert_eq!(config.timeout().as_secs(), 30);
/// assert_eq!(config.max_retries, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL, e.g. `https://api.example.com/`.
    pub base_url: String,

    /// Per-attempt timeout in seconds.
    #[builder(default = DEFAULT_TIMEOUT_SECS)]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after a connect failure or timeout. Every attempt is
    /// signed with a fresh timestamp.
    #[builder(default)]
    #[serde(default)]
    pub max_retries: u32,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    /// Load the client configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if `TCN_BASE_URL` is unset, or an
    /// auth configuration error if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var("TCN_BASE_URL")
            .map_err(|_| ClientError::InvalidUrl("TCN_BASE_URL is not set".to_owned()))?;

        Ok(Self {
            base_url,
            timeout_secs: env_number("TCN_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            max_retries: env_number("TCN_MAX_RETRIES", 0)?,
        })
    }

    /// The per-attempt timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ClientError> {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().map_err(|_| {
            ClientError::Auth(tcn_auth::AuthError::InvalidEnvVar {
                name: name.to_owned(),
                value: v.clone(),
            })
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_default_timeout_and_retries() {
        let config = ClientConfig::builder()
            .base_url("http://localhost:8080".to_owned())
            .build();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_should_deserialize_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"baseUrl":"http://localhost:8080"}"#).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.max_retries, 0);
    }
}
