#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod eligibility;
mod request;
mod service;

#[cfg(feature = "athena")]
#[cfg_attr(docsrs, doc(cfg(feature = "athena")))]
pub mod athena;

pub use eligibility::{EligibilityQuery, EligibilityQueryBuilder};
pub use lockext_core::{Error, ErrorKind, Result, ServiceHealth, ServiceStatus};
pub use request::{QueryExecution, QueryRequest};
pub use service::QueryService;

/// Tracing target for query operations.
pub const TRACING_TARGET: &str = "lockext_query";

/// Core trait for submitting catalog queries.
///
/// Implementations start an asynchronous execution and return as soon as
/// the engine has accepted it; results land in storage later.
#[async_trait::async_trait]
pub trait QueryProvider: Send + Sync {
    /// Starts a query execution.
    ///
    /// Submitting the same request token twice must not start a second
    /// execution.
    async fn start_query(&self, request: &QueryRequest) -> Result<QueryExecution>;

    /// Performs a health check on the query engine.
    async fn health_check(&self) -> Result<ServiceHealth>;
}
