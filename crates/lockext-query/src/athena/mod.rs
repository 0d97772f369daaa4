//! Amazon Athena query provider.

mod client;
mod error;

pub use client::AthenaProvider;

/// Tracing target for Athena operations.
pub const TRACING_TARGET: &str = "lockext_query::athena";
