//! Signing and verification configuration.
//!
//! Both sides are configured from environment variables:
//!
//! | Variable | Side | Default | Description |
//! |----------|------|---------|-------------|
//! | `TCN_API_TOKEN` | signer | *(required)* | Public API token |
//! | `TCN_API_SECRET` | signer | *(required)* | Shared secret |
//! | `TCN_CREDENTIALS` | verifier | *(optional)* | `token:secret,...` table, see [`crate::credentials`] |
//! | `TCN_SERVICE_MARKER` | both | `TCN` | Scheme marker in `Authorization` |
//! | `TCN_TIMESTAMP_TOLERANCE_SECS` | verifier | `300` | Allowed clock skew, either direction |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::credentials::ApiCredentials;
use crate::error::AuthError;

/// Default scheme marker placed before the token in `Authorization`.
pub const DEFAULT_SERVICE_MARKER: &str = "TCN";

/// Default freshness window, in seconds.
pub const DEFAULT_TIMESTAMP_TOLERANCE_SECS: u64 = 300;

/// Configuration for the signing side.
///
/// Holds the secret, so it is deliberately neither `Serialize` nor `Deserialize`.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Token and secret to sign with.
    pub credentials: ApiCredentials,
    /// Scheme marker, e.g. `TCN`.
    pub service_marker: String,
}

impl SigningConfig {
    /// Create a configuration with the default service marker.
    #[must_use]
    pub fn new(credentials: ApiCredentials) -> Self {
        Self {
            credentials,
            service_marker: DEFAULT_SERVICE_MARKER.to_owned(),
        }
    }

    /// Load the signing configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingEnvVar`] if the token or secret is unset,
    /// or the validation errors of [`ApiCredentials::new`].
    pub fn from_env() -> Result<Self, AuthError> {
        let api_token = required_env("TCN_API_TOKEN")?;
        let api_secret = required_env("TCN_API_SECRET")?;

        let mut config = Self::new(ApiCredentials::new(api_token, api_secret)?);
        if let Ok(v) = std::env::var("TCN_SERVICE_MARKER") {
            config.service_marker = v;
        }
        Ok(config)
    }
}

/// Configuration for the verifying side.
///
/// # Examples
///
/// ```
/// use tcn_auth::config::VerifierConfig;
///
/// let config = VerifierConfig::builder().timestamp_tolerance_secs(60).build();
/// assert_eq!(config.service_marker, "TCN");
/// assert_eq!(config.tolerance().as_secs(), 60);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct VerifierConfig {
    /// Scheme marker expected in `Authorization` (compared case-insensitively).
    #[builder(default = String::from(DEFAULT_SERVICE_MARKER))]
    pub service_marker: String,

    /// Maximum accepted distance between the request timestamp and now.
    #[builder(default = DEFAULT_TIMESTAMP_TOLERANCE_SECS)]
    pub timestamp_tolerance_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            service_marker: String::from(DEFAULT_SERVICE_MARKER),
            timestamp_tolerance_secs: DEFAULT_TIMESTAMP_TOLERANCE_SECS,
        }
    }
}

impl VerifierConfig {
    /// Load the verifier configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEnvVar`] if the tolerance is not an integer.
    pub fn from_env() -> Result<Self, AuthError> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("TCN_SERVICE_MARKER") {
            config.service_marker = v;
        }
        if let Ok(v) = std::env::var("TCN_TIMESTAMP_TOLERANCE_SECS") {
            config.timestamp_tolerance_secs =
                v.trim().parse().map_err(|_| AuthError::InvalidEnvVar {
                    name: "TCN_TIMESTAMP_TOLERANCE_SECS".to_owned(),
                    value: v.clone(),
                })?;
        }

        Ok(config)
    }

    /// The freshness window as a [`Duration`].
    #[must_use]
    pub fn tolerance(&self) -> Duration {
        Duration::from_secs(self.timestamp_tolerance_secs)
    }
}

pub(crate) fn required_env(name: &str) -> Result<String, AuthError> {
    std::env::var(name).map_err(|_| AuthError::MissingEnvVar(name.to_owned()))
}

/// Check that a service marker can be used as an HTTP auth scheme.
pub(crate) fn validate_service_marker(marker: &str) -> Result<(), AuthError> {
    if marker.is_empty() || marker.contains(|c: char| c.is_whitespace() || c == ':') {
        return Err(AuthError::InvalidServiceMarker(marker.to_owned()));
    }
    Ok(())
}
