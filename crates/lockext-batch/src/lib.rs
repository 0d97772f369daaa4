#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod request;
mod response;
mod service;

#[cfg(feature = "s3control")]
#[cfg_attr(docsrs, doc(cfg(feature = "s3control")))]
pub mod s3control;

pub use lockext_core::{Error, ErrorKind, Result, ServiceHealth, ServiceStatus};
pub use request::{
    BatchJobRequest, BatchJobRequestBuilder, JobManifest, JobReport, JobTag, REPORT_FORMAT,
    ReportScope, RetentionMode, RetentionOperation,
};
pub use response::JobReceipt;
pub use service::BatchJobService;

/// Tracing target for bulk job operations.
pub const TRACING_TARGET: &str = "lockext_batch";

/// Core trait for submitting bulk jobs.
#[async_trait::async_trait]
pub trait BatchJobProvider: Send + Sync {
    /// Creates a job.
    ///
    /// Submitting the same request token twice must not create a second
    /// job.
    async fn create_job(&self, request: &BatchJobRequest) -> Result<JobReceipt>;

    /// Performs a health check on the job engine.
    async fn health_check(&self) -> Result<ServiceHealth>;
}
