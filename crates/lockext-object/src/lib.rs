#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod provider;
mod s3;

pub use client::{ObjectInfo, ObjectPrefix, ObjectStoreClient};
pub use provider::ObjectStoreProvider;
pub use s3::{S3Config, S3Provider};

/// Tracing target for object-store operations.
pub const TRACING_TARGET: &str = "lockext_object";
