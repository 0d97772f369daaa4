//! NATS errors.

use std::time::Duration;

/// Result alias for NATS operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure talking to NATS or JetStream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The connection could not be established or was lost.
    #[error("nats connection failed: {0}")]
    Connect(#[from] async_nats::Error),

    /// The server did not answer in time.
    #[error("nats did not answer within {after:?}")]
    Timeout { after: Duration },

    /// The stream could not be created or looked up.
    #[error("stream '{stream}': {reason}")]
    Stream { stream: String, reason: String },

    /// The durable consumer could not be bound or read.
    #[error("consumer '{consumer}': {reason}")]
    Consumer { consumer: String, reason: String },

    /// A message could not be acked, nacked or terminated.
    #[error("settling message on '{subject}' failed: {reason}")]
    Settle { subject: String, reason: String },

    /// Connection settings are unusable.
    #[error("invalid nats configuration: {reason}")]
    Config { reason: String },
}

impl Error {
    pub(crate) fn connect(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connect(Box::new(source))
    }

    /// Stream creation or lookup failure.
    pub fn stream_error(stream: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Stream {
            stream: stream.into(),
            reason: reason.into(),
        }
    }

    /// Consumer binding or delivery failure.
    pub fn consumer_error(consumer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Consumer {
            consumer: consumer.into(),
            reason: reason.into(),
        }
    }

    /// Settlement failure.
    pub fn ack(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Settle {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Invalid connection settings.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Deadline exceeded.
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout { after }
    }

    /// Whether the same call may succeed once the connection recovers.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_resource() {
        let error = Error::consumer_error("lockext-query", "consumer not found");
        assert_eq!(error.to_string(), "consumer 'lockext-query': consumer not found");

        let error = Error::stream_error("STORAGE_EVENTS", "insufficient resources");
        assert_eq!(error.to_string(), "stream 'STORAGE_EVENTS': insufficient resources");
    }

    #[test]
    fn test_only_connection_problems_are_transient() {
        assert!(Error::timeout(Duration::from_secs(5)).is_transient());
        assert!(!Error::invalid_config("empty url").is_transient());
        assert!(!Error::ack("storage.events.manifests", "no reply").is_transient());
    }
}
