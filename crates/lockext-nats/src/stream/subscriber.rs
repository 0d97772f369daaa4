//! Durable pull subscriber bound to one subject filter.

use std::time::Duration;

use async_nats::jetstream::{self, consumer, stream};
use serde::{Deserialize, Serialize};

use super::event_stream::EventStream;
use super::message::EventMessages;
use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Default time the server waits for an acknowledgement before redelivering.
pub const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(300);

/// Default number of delivery attempts per message.
pub const DEFAULT_MAX_DELIVER: i64 = 5;

/// Durable consumer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Durable consumer name, shared by every replica of one stage.
    pub durable_name: String,
    /// Subject filter selecting the messages this consumer receives.
    pub filter_subject: String,
    /// Delivery attempts before the server gives up on a message.
    pub max_deliver: i64,
    /// Time the server waits for an acknowledgement.
    pub ack_wait: Duration,
}

impl ConsumerConfig {
    /// Creates settings with default delivery limits.
    pub fn new(durable_name: impl Into<String>, filter_subject: impl Into<String>) -> Self {
        Self {
            durable_name: durable_name.into(),
            filter_subject: filter_subject.into(),
            max_deliver: DEFAULT_MAX_DELIVER,
            ack_wait: DEFAULT_ACK_WAIT,
        }
    }

    /// Sets the delivery attempt limit.
    #[must_use]
    pub fn with_max_deliver(mut self, max_deliver: i64) -> Self {
        self.max_deliver = max_deliver;
        self
    }

    /// Sets the acknowledgement timeout.
    #[must_use]
    pub fn with_ack_wait(mut self, ack_wait: Duration) -> Self {
        self.ack_wait = ack_wait;
        self
    }

    fn to_pull_config(&self) -> consumer::pull::Config {
        consumer::pull::Config {
            name: Some(self.durable_name.clone()),
            durable_name: Some(self.durable_name.clone()),
            description: Some(format!("Consumer for {}", self.filter_subject)),
            filter_subject: self.filter_subject.clone(),
            ack_policy: consumer::AckPolicy::Explicit,
            ack_wait: self.ack_wait,
            max_deliver: self.max_deliver,
            ..Default::default()
        }
    }
}

/// Durable pull consumer on one stream.
#[derive(Debug)]
pub struct EventSubscriber {
    consumer: consumer::PullConsumer,
    stream_name: &'static str,
    config: ConsumerConfig,
}

impl EventSubscriber {
    /// Ensures the stream exists, then gets or creates the durable consumer.
    pub(crate) async fn new<S: EventStream>(
        jetstream: &jetstream::Context,
        config: ConsumerConfig,
    ) -> Result<Self> {
        let stream_config = stream::Config {
            name: S::NAME.to_owned(),
            description: Some(S::DESCRIPTION.to_owned()),
            subjects: vec![S::wildcard_subject()],
            max_age: S::MAX_AGE.unwrap_or_default(),
            ..Default::default()
        };

        let stream = jetstream
            .get_or_create_stream(stream_config)
            .await
            .map_err(|e| Error::stream_error(S::NAME, e.to_string()))?;

        let consumer = stream
            .get_or_create_consumer(&config.durable_name, config.to_pull_config())
            .await
            .map_err(|e| Error::consumer_error(&config.durable_name, e.to_string()))?;

        tracing::info!(
            target: TRACING_TARGET_STREAM,
            stream = S::NAME,
            consumer = %config.durable_name,
            filter_subject = %config.filter_subject,
            max_deliver = config.max_deliver,
            ack_wait_secs = config.ack_wait.as_secs(),
            "Durable consumer ready"
        );

        Ok(Self {
            consumer,
            stream_name: S::NAME,
            config,
        })
    }

    /// Opens a continuous message stream.
    pub async fn messages(&self) -> Result<EventMessages> {
        let messages = self
            .consumer
            .messages()
            .await
            .map_err(|e| Error::consumer_error(&self.config.durable_name, e.to_string()))?;

        Ok(EventMessages::new(messages, self.config.durable_name.clone()))
    }

    /// Returns the stream name.
    #[inline]
    pub fn stream_name(&self) -> &'static str {
        self.stream_name
    }

    /// Returns the consumer settings.
    #[inline]
    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }
}
