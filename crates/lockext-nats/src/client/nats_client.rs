//! Shared NATS connection for the stage workers.
//!
//! `NatsClient` wraps one multiplexed `async-nats` connection. Clones share
//! the same TCP connection and JetStream context.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_nats::{Client, ConnectOptions, jetstream};
use lockext_core::ServiceHealth;
use tokio::time::timeout;

use super::nats_config::NatsConfig;
use crate::stream::{ConsumerConfig, EventStream, EventSubscriber};
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

const PING_TIMEOUT: Duration = Duration::from_secs(10);
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Connected NATS client plus its JetStream context.
///
/// Both stage workers share one instance; clones share the connection.
#[derive(Debug, Clone)]
pub struct NatsClient {
    inner: Arc<NatsClientInner>,
}

#[derive(Debug)]
struct NatsClientInner {
    client: Client,
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsClient {
    /// Create a new NATS client and connect.
    #[tracing::instrument(skip(config), target = TRACING_TARGET_CONNECTION)]
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            servers = %config.nats_url,
            client_name = %config.nats_client_name,
            "Connecting to NATS"
        );

        let mut connect_opts = ConnectOptions::new()
            .name(&config.nats_client_name)
            .ping_interval(PING_INTERVAL)
            .connection_timeout(config.connect_timeout())
            .reconnect_delay_callback(NatsConfig::reconnect_backoff);

        if let Some(token) = &config.nats_token {
            connect_opts = connect_opts.token(token.clone());
        }

        if let Some(max_reconnects) = config.max_reconnects() {
            connect_opts = connect_opts.max_reconnects(max_reconnects);
        }

        let connect_timeout = config.connect_timeout();
        let client = timeout(
            connect_timeout,
            async_nats::connect_with_options(config.nats_url.as_str(), connect_opts),
        )
        .await
        .map_err(|_| Error::timeout(connect_timeout))?
        .map_err(Error::connect)?;

        let jetstream = jetstream::new(client.clone());

        let server_info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            server_host = %server_info.host,
            server_version = %server_info.version,
            server_id = %server_info.server_id,
            max_payload = server_info.max_payload,
            "Connected to NATS"
        );

        Ok(Self {
            inner: Arc::new(NatsClientInner {
                client,
                jetstream,
                config,
            }),
        })
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &NatsConfig {
        &self.inner.config
    }

    /// Get the JetStream context.
    #[must_use]
    pub fn jetstream(&self) -> &jetstream::Context {
        &self.inner.jetstream
    }

    /// Test connectivity with a round trip to the server.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CONNECTION)]
    pub async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();

        timeout(PING_TIMEOUT, self.inner.client.flush())
            .await
            .map_err(|_| Error::timeout(PING_TIMEOUT))?
            .map_err(Error::connect)?;

        let round_trip = start.elapsed();
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            round_trip_ms = round_trip.as_millis(),
            "NATS ping successful"
        );
        Ok(round_trip)
    }

    /// Whether the connection is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(
            self.inner.client.connection_state(),
            async_nats::connection::State::Connected
        )
    }

    /// Reports connection health.
    pub async fn health_check(&self) -> ServiceHealth {
        match self.ping().await {
            Ok(elapsed) => ServiceHealth::healthy().with_response_time(elapsed),
            Err(err) if self.is_connected() => ServiceHealth::degraded(err.to_string()),
            Err(err) => ServiceHealth::unhealthy(err.to_string()),
        }
    }

    /// Ensures the stream exists and binds a durable pull consumer to it.
    #[tracing::instrument(
        skip(self, config),
        fields(stream = S::NAME, consumer = %config.durable_name),
        target = TRACING_TARGET_CLIENT
    )]
    pub async fn event_subscriber<S: EventStream>(
        &self,
        config: ConsumerConfig,
    ) -> Result<EventSubscriber> {
        EventSubscriber::new::<S>(&self.inner.jetstream, config).await
    }
}
