//! Amazon S3 Control provider for Batch Operations jobs.

mod client;
mod error;

pub use client::S3ControlProvider;

/// Tracing target for S3 Control operations.
pub const TRACING_TARGET: &str = "lockext_batch::s3control";
