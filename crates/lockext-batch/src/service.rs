//! Bulk job service wrapper with observability.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::{BatchJobProvider, BatchJobRequest, JobReceipt, Result, ServiceHealth, TRACING_TARGET};

/// Bulk job service wrapper with observability.
///
/// Adds timing and structured logging to any [`BatchJobProvider`].
#[derive(Clone)]
pub struct BatchJobService {
    inner: Arc<dyn BatchJobProvider>,
}

impl fmt::Debug for BatchJobService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchJobService").finish_non_exhaustive()
    }
}

impl BatchJobService {
    /// Creates a new bulk job service wrapper.
    pub fn new<P>(provider: P) -> Self
    where
        P: BatchJobProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Submits a job.
    pub async fn create_job(&self, request: &BatchJobRequest) -> Result<JobReceipt> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            manifest = %request.manifest.object_arn,
            etag = %request.manifest.etag,
            format = %request.manifest.schema.format,
            retain_until = %request.operation.retain_until,
            mode = %request.operation.mode,
            priority = request.priority,
            token = %request.client_request_token,
            "Creating bulk job"
        );

        let result = self.inner.create_job(request).await;
        let elapsed = started_at.elapsed();

        match &result {
            Ok(receipt) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    job_id = %receipt.job_id,
                    request_id = ?receipt.request_id,
                    extended_request_id = ?receipt.extended_request_id,
                    elapsed_ms = elapsed.as_millis(),
                    "Bulk job created"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    manifest = %request.manifest.object_arn,
                    token = %request.client_request_token,
                    error = %error,
                    retryable = error.is_retryable(),
                    elapsed_ms = elapsed.as_millis(),
                    "Bulk job creation failed"
                );
            }
        }

        result
    }

    /// Checks that the job engine is reachable.
    pub async fn health_check(&self) -> Result<ServiceHealth> {
        let started_at = Instant::now();
        let result = self.inner.health_check().await;

        tracing::debug!(
            target: TRACING_TARGET,
            healthy = result.as_ref().is_ok_and(ServiceHealth::is_available),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Job engine health checked"
        );

        result
    }
}
