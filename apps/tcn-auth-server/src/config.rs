//! Gateway process configuration.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default bind address.
pub const DEFAULT_GATEWAY_LISTEN: &str = "0.0.0.0:8080";

/// Default time in-flight requests get to finish after a shutdown signal.
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 30;

/// Process-level settings of the gateway.
///
/// Verification settings live in [`tcn_auth::VerifierConfig`] and the
/// credential table in [`tcn_auth::StaticCredentialProvider::from_env`]; this
/// struct only covers the process.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:8080`.
    #[builder(default = String::from(DEFAULT_GATEWAY_LISTEN))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Path of the unsigned health endpoint.
    #[builder(default = String::from(tcn_auth_http::service::DEFAULT_HEALTH_PATH))]
    pub health_path: String,

    /// Seconds to wait for in-flight requests once shutdown starts.
    #[builder(default = DEFAULT_DRAIN_TIMEOUT_SECS)]
    pub drain_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8080` |
    /// | `LOG_LEVEL` | `info` |
    /// | `HEALTH_PATH` | `/health` |
    /// | `DRAIN_TIMEOUT_SECS` | `30` |
    ///
    /// An unparseable `DRAIN_TIMEOUT_SECS` keeps the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("HEALTH_PATH") {
            config.health_path = v;
        }
        if let Some(secs) = std::env::var("DRAIN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.drain_timeout_secs = secs;
        }

        config
    }

    /// How long shutdown waits for open connections.
    #[must_use]
    pub fn drain_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.drain_timeout_secs)
    }

    /// Address the `--health-check` probe connects to.
    #[must_use]
    pub fn probe_addr(&self) -> String {
        self.gateway_listen.replace("0.0.0.0", "127.0.0.1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.gateway_listen, "0.0.0.0:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.health_path, "/health");
        assert_eq!(config.drain_timeout().as_secs(), 30);
    }

    #[test]
    fn test_should_probe_loopback_for_wildcard_bind() {
        let config = ServerConfig::default();
        assert_eq!(config.probe_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_should_deserialize_camel_case_config() {
        let config: ServerConfig = serde_json::from_str(
            r#"{"gatewayListen":"127.0.0.1:9000","logLevel":"debug","healthPath":"/_health","drainTimeoutSecs":5}"#,
        )
        .unwrap();
        assert_eq!(config.gateway_listen, "127.0.0.1:9000");
        assert_eq!(config.health_path, "/_health");
        assert_eq!(config.drain_timeout_secs, 5);
    }
}
