//! Event stream configuration for NATS JetStream.

use std::time::Duration;

/// Static configuration of a JetStream stream.
pub trait EventStream: Send + Sync + 'static {
    /// Stream name used in NATS JetStream.
    const NAME: &'static str;

    /// Subject prefix; the stream captures `{SUBJECT}.>`.
    const SUBJECT: &'static str;

    /// Maximum age for messages in this stream.
    /// `None` keeps messages until they are acknowledged or evicted by limits.
    const MAX_AGE: Option<Duration>;

    /// Human readable description stored with the stream.
    const DESCRIPTION: &'static str;

    /// Wildcard subject captured by the stream.
    fn wildcard_subject() -> String {
        format!("{}.>", Self::SUBJECT)
    }

    /// Fully qualified subject for one event class.
    fn subject(suffix: &str) -> String {
        format!("{}.{suffix}", Self::SUBJECT)
    }
}

/// Stream receiving object storage notifications.
///
/// Messages expire after 7 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StorageEventStream;

impl EventStream for StorageEventStream {
    const DESCRIPTION: &'static str = "Object storage notifications for retention extension";
    const MAX_AGE: Option<Duration> = Some(Duration::from_secs(7 * 24 * 60 * 60));
    const NAME: &'static str = "STORAGE_EVENTS";
    const SUBJECT: &'static str = "storage.events";
}
