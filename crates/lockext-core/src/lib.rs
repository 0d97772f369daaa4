#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod health;

pub mod event;
pub mod manifest;
pub mod partition;
pub mod resource;
pub mod retention;
pub mod token;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use event::{StorageEventRecord, StorageNotification, TriggerEvent};
pub use health::{ServiceHealth, ServiceStatus};
pub use manifest::{
    KeyMatcher, ManifestField, ManifestFormat, ManifestSchema, ManifestSource, ManifestSources,
};
pub use partition::Partition;
pub use resource::{Arn, ObjectRef};
pub use retention::{RetentionPolicy, compute_cutoff, compute_retain_until};
pub use token::{IdempotencyToken, TokenRules};
