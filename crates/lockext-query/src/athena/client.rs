//! Athena client implementing [`QueryProvider`].

use std::sync::Arc;
use std::time::Instant;

use aws_config::SdkConfig;
use aws_sdk_athena::Client;
use aws_sdk_athena::types::QueryExecutionContext;
use lockext_core::{Error, ErrorKind, Result, ServiceHealth};

use super::TRACING_TARGET;
use super::error::from_sdk_error;
use crate::{QueryExecution, QueryProvider, QueryRequest, QueryService};

/// Amazon Athena query provider.
///
/// Retry behavior (attempts, backoff) comes from the [`SdkConfig`] the
/// provider is built with.
#[derive(Clone)]
pub struct AthenaProvider {
    inner: Arc<Client>,
}

impl std::fmt::Debug for AthenaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AthenaProvider").finish_non_exhaustive()
    }
}

impl AthenaProvider {
    /// Creates a provider from shared AWS configuration.
    pub fn new(sdk_config: &SdkConfig) -> Self {
        let config = aws_sdk_athena::config::Builder::from(sdk_config).build();
        Self::from_client(Client::from_conf(config))
    }

    /// Creates a provider from a pre-built client.
    pub fn from_client(client: Client) -> Self {
        tracing::debug!(target: TRACING_TARGET, "Athena provider created");
        Self {
            inner: Arc::new(client),
        }
    }

    /// Wraps this provider into a [`QueryService`].
    pub fn into_service(self) -> QueryService {
        QueryService::new(self)
    }
}

#[async_trait::async_trait]
impl QueryProvider for AthenaProvider {
    #[tracing::instrument(
        skip(self, request),
        fields(workgroup = %request.workgroup, token = %request.client_request_token),
        target = TRACING_TARGET
    )]
    async fn start_query(&self, request: &QueryRequest) -> Result<QueryExecution> {
        let context = QueryExecutionContext::builder()
            .database(&request.database)
            .build();

        let output = self
            .inner
            .start_query_execution()
            .query_string(&request.query_string)
            .query_execution_context(context)
            .work_group(&request.workgroup)
            .client_request_token(request.client_request_token.as_str())
            .send()
            .await
            .map_err(from_sdk_error)?;

        let execution_id = output.query_execution_id().ok_or_else(|| {
            Error::new(ErrorKind::ExternalError)
                .with_message("Athena accepted the query without an execution id")
        })?;

        Ok(QueryExecution::new(execution_id))
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        let started_at = Instant::now();
        let result = self.inner.list_work_groups().max_results(1).send().await;

        let health = match result {
            Ok(_) => ServiceHealth::healthy(),
            Err(err) => {
                let error = from_sdk_error(err);
                if error.kind == ErrorKind::Authorization {
                    ServiceHealth::degraded(error.to_string())
                } else {
                    ServiceHealth::unhealthy(error.to_string())
                }
            }
        };

        Ok(health.with_response_time(started_at.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_from_offline_config() {
        let config = aws_sdk_athena::Config::builder()
            .behavior_version_latest()
            .region(aws_sdk_athena::config::Region::new("us-east-1"))
            .build();
        let provider = AthenaProvider::from_client(Client::from_conf(config));
        let _service = provider.into_service();
    }

    #[test]
    fn test_provider_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AthenaProvider>();
    }
}
