//! NATS connection settings.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DEFAULT_URL: &str = "nats://127.0.0.1:4222";
const DEFAULT_CLIENT_NAME: &str = "lockext-worker";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// First reconnect delay; doubles per attempt.
const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(500);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Where and how the stage workers connect to NATS.
///
/// Reconnection is unlimited by default: a worker that gives up on the
/// server stops consuming storage events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct NatsConfig {
    /// Server URLs, comma separated for a cluster.
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-url", env = "NATS_URL", default_value = DEFAULT_URL)
    )]
    #[serde(default = "default_url")]
    pub nats_url: String,

    /// Token for token authentication.
    #[cfg_attr(feature = "config", arg(long = "nats-token", env = "NATS_TOKEN"))]
    #[serde(default)]
    pub nats_token: Option<String>,

    /// Name reported to the server.
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-client-name", env = "NATS_CLIENT_NAME", default_value = DEFAULT_CLIENT_NAME)
    )]
    #[serde(default = "default_client_name")]
    pub nats_client_name: String,

    /// Seconds allowed for the initial connection.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "nats-connect-timeout-secs",
            env = "NATS_CONNECT_TIMEOUT_SECS",
            default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS
        )
    )]
    #[serde(default = "default_connect_timeout_secs")]
    pub nats_connect_timeout_secs: u64,

    /// Reconnect attempts before the connection is abandoned; 0 never gives up.
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-max-reconnects", env = "NATS_MAX_RECONNECTS", default_value_t = 0)
    )]
    #[serde(default)]
    pub nats_max_reconnects: usize,
}

fn default_url() -> String {
    DEFAULT_URL.to_owned()
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_owned()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl NatsConfig {
    /// Settings for `url` with default timeouts and no credentials.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            nats_url: url.into(),
            nats_token: None,
            nats_client_name: default_client_name(),
            nats_connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            nats_max_reconnects: 0,
        }
    }

    /// Uses token authentication.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.nats_token = Some(token.into());
        self
    }

    /// Overrides the client name.
    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.nats_client_name = name.into();
        self
    }

    /// Overrides the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.nats_connect_timeout_secs = timeout.as_secs();
        self
    }

    /// Caps reconnect attempts; 0 removes the cap.
    #[must_use]
    pub fn with_max_reconnects(mut self, max_reconnects: usize) -> Self {
        self.nats_max_reconnects = max_reconnects;
        self
    }

    /// Individual server addresses.
    pub fn server_addrs(&self) -> impl Iterator<Item = &str> {
        self.nats_url.split(',').map(str::trim)
    }

    /// Timeout for the initial connection.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.nats_connect_timeout_secs)
    }

    /// Reconnect cap, `None` when unlimited.
    pub fn max_reconnects(&self) -> Option<usize> {
        (self.nats_max_reconnects > 0).then_some(self.nats_max_reconnects)
    }

    /// Delay before reconnect attempt `attempt`: exponential, capped at 30s.
    pub fn reconnect_backoff(attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.min(16)).unwrap_or(16);
        RECONNECT_BASE_DELAY
            .saturating_mul(2_u32.saturating_pow(exponent))
            .min(RECONNECT_MAX_DELAY)
    }

    /// Checks addresses, token and timeout.
    pub fn validate(&self) -> Result<()> {
        for addr in self.server_addrs() {
            if !(addr.starts_with("nats://") || addr.starts_with("tls://")) {
                return Err(Error::invalid_config(format!(
                    "'{addr}' is not a nats:// or tls:// address"
                )));
            }
        }

        if matches!(self.nats_token.as_deref(), Some("")) {
            return Err(Error::invalid_config("NATS token is set but empty"));
        }

        if self.nats_connect_timeout_secs == 0 {
            return Err(Error::invalid_config("connect timeout must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reconnect_forever() {
        let config = NatsConfig::default();
        assert_eq!(config.nats_client_name, "lockext-worker");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_reconnects(), None);
        config.validate().unwrap();
    }

    #[test]
    fn test_splits_cluster_addresses() {
        let config = NatsConfig::new("nats://a:4222, tls://b:4222");
        let addrs: Vec<_> = config.server_addrs().collect();
        assert_eq!(addrs, ["nats://a:4222", "tls://b:4222"]);
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(NatsConfig::new("").validate().is_err());
        assert!(NatsConfig::new("localhost:4222").validate().is_err());
        assert!(NatsConfig::default().with_token("").validate().is_err());
        assert!(
            NatsConfig::default()
                .with_connect_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(NatsConfig::reconnect_backoff(0), Duration::from_millis(500));
        assert_eq!(NatsConfig::reconnect_backoff(1), Duration::from_secs(1));
        assert_eq!(NatsConfig::reconnect_backoff(3), Duration::from_secs(4));
        assert_eq!(NatsConfig::reconnect_backoff(40), Duration::from_secs(30));
    }

    #[test]
    fn test_builder_overrides() {
        let config = NatsConfig::default()
            .with_token("secret")
            .with_client_name("lockext-manifest")
            .with_max_reconnects(5);
        assert_eq!(config.nats_token.as_deref(), Some("secret"));
        assert_eq!(config.nats_client_name, "lockext-manifest");
        assert_eq!(config.max_reconnects(), Some(5));
    }
}
