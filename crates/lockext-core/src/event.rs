//! Storage event notifications.
//!
//! Notifications follow the S3 event message structure. A single message
//! may batch several records; each `ObjectCreated` record becomes one
//! [`TriggerEvent`] and is processed on its own.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind, ObjectRef, Result};

/// Prefix shared by every object creation event name.
const OBJECT_CREATED: &str = "ObjectCreated:";

/// A storage event notification message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageNotification {
    /// Records carried by this message; empty for test events.
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageEventRecord>,
}

impl StorageNotification {
    /// Parses a notification from raw JSON bytes.
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// One record of a storage event notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEventRecord {
    /// Event type, e.g. `ObjectCreated:Put`.
    #[serde(default)]
    pub event_name: String,
    /// When the event happened, as reported by the storage service.
    #[serde(default)]
    pub event_time: Option<String>,
    /// Storage entity the event refers to.
    pub s3: StorageEntity,
}

/// Bucket and object the record refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEntity {
    /// Bucket details.
    pub bucket: StorageBucket,
    /// Object details.
    pub object: StorageObject,
}

/// Bucket part of a storage event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageBucket {
    /// Bucket name.
    pub name: String,
}

/// Object part of a storage event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageObject {
    /// Form encoded object key.
    pub key: String,
    /// Object size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Entity tag at the time of the event.
    #[serde(default)]
    pub e_tag: Option<String>,
    /// Per-bucket ordering marker, unique per event.
    #[serde(default)]
    pub sequencer: Option<String>,
}

impl StorageEventRecord {
    /// Returns `true` for any object creation event.
    #[must_use]
    pub fn is_object_created(&self) -> bool {
        self.event_name.contains(OBJECT_CREATED)
    }
}

/// A validated object creation event that starts a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Object that was written, with its key decoded.
    pub object: ObjectRef,
    /// Sequencer of the event, the source of every idempotency token.
    pub sequencer: String,
    /// Event type as reported by the storage service.
    pub event_name: String,
    /// Object size, if reported.
    pub size: Option<u64>,
    /// When the storage service recorded the event.
    ///
    /// Redeliveries carry the same value, so dates derived from it are
    /// stable across attempts.
    pub event_time: Option<Timestamp>,
}

impl TriggerEvent {
    /// Creates a trigger event from already decoded parts.
    pub fn new(object: ObjectRef, sequencer: impl Into<String>) -> Self {
        Self {
            object,
            sequencer: sequencer.into(),
            event_name: "ObjectCreated:Put".to_owned(),
            size: None,
            event_time: None,
        }
    }

    /// Sets the event time.
    pub fn with_event_time(mut self, event_time: Timestamp) -> Self {
        self.event_time = Some(event_time);
        self
    }

    /// Validates a record and decodes its object key.
    pub fn from_record(record: &StorageEventRecord) -> Result<Self> {
        if !record.is_object_created() {
            return Err(Error::invalid_input(format!(
                "Unsupported event type '{}'",
                record.event_name
            )));
        }

        let sequencer = record
            .s3
            .object
            .sequencer
            .as_deref()
            .map(str::trim)
            .filter(|sequencer| !sequencer.is_empty())
            .ok_or_else(|| {
                Error::invalid_input("Event record has no sequencer")
                    .with_context(record.s3.object.key.clone())
            })?;

        let key = decode_key(&record.s3.object.key)?;
        if key.is_empty() {
            return Err(Error::invalid_input("Event record has an empty object key"));
        }

        let event_time = record
            .event_time
            .as_deref()
            .map(|raw| {
                raw.parse::<Timestamp>().map_err(|err| {
                    Error::from_source(ErrorKind::InvalidInput, err)
                        .with_message("Event record has an invalid event time")
                        .with_context(raw.to_owned())
                })
            })
            .transpose()?;

        Ok(Self {
            object: ObjectRef::new(record.s3.bucket.name.clone(), key),
            sequencer: sequencer.to_owned(),
            event_name: record.event_name.clone(),
            size: record.s3.object.size,
            event_time,
        })
    }
}

/// Decodes a form encoded key: `+` is a space, then percent escapes apply.
pub fn decode_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).map_err(|err| {
        Error::from_source(ErrorKind::InvalidInput, err)
            .with_message("Object key is not valid UTF-8")
            .with_context(raw.to_owned())
    })?;
    Ok(decoded.into_owned())
}
