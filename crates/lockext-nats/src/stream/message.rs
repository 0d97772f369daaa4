//! Delivered messages and their settlement.

use std::time::Duration;

use async_nats::jetstream::{self, AckKind, consumer};
use futures::StreamExt;

use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Continuous stream of messages from one durable consumer.
pub struct EventMessages {
    inner: consumer::pull::Stream,
    consumer_name: String,
}

impl std::fmt::Debug for EventMessages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventMessages")
            .field("consumer_name", &self.consumer_name)
            .finish_non_exhaustive()
    }
}

impl EventMessages {
    pub(crate) fn new(inner: consumer::pull::Stream, consumer_name: String) -> Self {
        Self {
            inner,
            consumer_name,
        }
    }

    /// Waits for the next message.
    ///
    /// Returns `Ok(None)` once the server closes the stream.
    pub async fn next(&mut self) -> Result<Option<EventMessage>> {
        match self.inner.next().await {
            Some(Ok(message)) => Ok(Some(EventMessage::new(message))),
            Some(Err(err)) => Err(Error::consumer_error(&self.consumer_name, err.to_string())),
            None => Ok(None),
        }
    }
}

/// One delivered message awaiting settlement.
pub struct EventMessage {
    inner: jetstream::Message,
}

impl std::fmt::Debug for EventMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventMessage")
            .field("subject", &self.subject())
            .field("payload_len", &self.payload().len())
            .finish()
    }
}

impl EventMessage {
    fn new(inner: jetstream::Message) -> Self {
        Self { inner }
    }

    /// Raw message body.
    pub fn payload(&self) -> &[u8] {
        &self.inner.payload
    }

    /// Subject the message was published on.
    pub fn subject(&self) -> &str {
        self.inner.subject.as_str()
    }

    /// Delivery attempt number, starting at 1.
    pub fn delivered(&self) -> Option<i64> {
        self.inner.info().ok().map(|info| info.delivered)
    }

    /// Marks the message as processed.
    pub async fn ack(&self) -> Result<()> {
        self.settle(AckKind::Ack).await
    }

    /// Asks the server to redeliver the message after `delay`.
    pub async fn retry(&self, delay: Duration) -> Result<()> {
        self.settle(AckKind::Nak(Some(delay))).await
    }

    /// Stops redelivery of a message that can never succeed.
    pub async fn term(&self) -> Result<()> {
        self.settle(AckKind::Term).await
    }

    async fn settle(&self, kind: AckKind) -> Result<()> {
        tracing::trace!(
            target: TRACING_TARGET_STREAM,
            subject = %self.subject(),
            ack = ?kind,
            "Settling message"
        );

        self.inner
            .ack_with(kind)
            .await
            .map_err(|e| Error::ack(self.subject(), e.to_string()))
    }
}
