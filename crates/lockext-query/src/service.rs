//! Query service wrapper with observability.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::{QueryExecution, QueryProvider, QueryRequest, Result, ServiceHealth, TRACING_TARGET};

/// Query service wrapper with observability.
///
/// Adds timing and structured logging to any [`QueryProvider`]. The
/// provider is held in an `Arc`, so clones are cheap.
#[derive(Clone)]
pub struct QueryService {
    inner: Arc<dyn QueryProvider>,
}

impl fmt::Debug for QueryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryService").finish_non_exhaustive()
    }
}

impl QueryService {
    /// Creates a new query service wrapper.
    pub fn new<P>(provider: P) -> Self
    where
        P: QueryProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Starts a query execution.
    pub async fn start_query(&self, request: &QueryRequest) -> Result<QueryExecution> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            database = %request.database,
            workgroup = %request.workgroup,
            token = %request.client_request_token,
            query = %request.query_string,
            "Starting query execution"
        );

        let result = self.inner.start_query(request).await;
        let elapsed = started_at.elapsed();

        match &result {
            Ok(execution) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    execution_id = %execution.execution_id,
                    token = %request.client_request_token,
                    elapsed_ms = elapsed.as_millis(),
                    "Query execution started"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    token = %request.client_request_token,
                    error = %error,
                    retryable = error.is_retryable(),
                    elapsed_ms = elapsed.as_millis(),
                    "Query execution could not be started"
                );
            }
        }

        result
    }

    /// Checks that the query engine is reachable.
    pub async fn health_check(&self) -> Result<ServiceHealth> {
        let started_at = Instant::now();
        let result = self.inner.health_check().await;

        tracing::debug!(
            target: TRACING_TARGET,
            healthy = result.as_ref().is_ok_and(ServiceHealth::is_available),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Query engine health checked"
        );

        result
    }
}
