//! Mock query provider.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use lockext_core::{Error, ErrorKind, Result, ServiceHealth};
use lockext_query::{QueryExecution, QueryProvider, QueryRequest, QueryService};

use super::lock;

#[derive(Debug, Default)]
struct QueryState {
    requests: Vec<QueryRequest>,
    executions: HashMap<String, (String, QueryRequest)>,
    failures: VecDeque<ErrorKind>,
}

/// Mock query provider for testing.
///
/// Clones share state, so a test can keep one handle for assertions and
/// hand another to the code under test. Like the query engine, a token
/// reused with a different query is refused.
#[derive(Debug, Clone, Default)]
pub struct MockQueryProvider {
    state: Arc<Mutex<QueryState>>,
}

impl MockQueryProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next submission fail with `kind`.
    pub fn fail_next(&self, kind: ErrorKind) {
        lock(&self.state).failures.push_back(kind);
    }

    /// Every submitted request, including failed and repeated ones.
    pub fn requests(&self) -> Vec<QueryRequest> {
        lock(&self.state).requests.clone()
    }

    /// Number of distinct executions started.
    pub fn execution_count(&self) -> usize {
        lock(&self.state).executions.len()
    }

    /// Wraps a clone of this provider into a [`QueryService`].
    pub fn service(&self) -> QueryService {
        QueryService::new(self.clone())
    }
}

#[async_trait::async_trait]
impl QueryProvider for MockQueryProvider {
    async fn start_query(&self, request: &QueryRequest) -> Result<QueryExecution> {
        let mut state = lock(&self.state);
        state.requests.push(request.clone());

        if let Some(kind) = state.failures.pop_front() {
            return Err(Error::new(kind).with_message("Scripted query failure"));
        }

        let next_id = format!("execution-{}", state.executions.len() + 1);
        let (execution_id, first) = state
            .executions
            .entry(request.client_request_token.to_string())
            .or_insert_with(|| (next_id, request.clone()));

        if *first != *request {
            return Err(Error::new(ErrorKind::InvalidInput)
                .with_message("Client request token was reused with a different query")
                .with_context(request.client_request_token.to_string()));
        }
        let execution_id = execution_id.clone();

        Ok(QueryExecution::new(execution_id))
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}

#[cfg(test)]
mod tests {
    use lockext_core::IdempotencyToken;

    use super::*;

    fn request(marker: &str) -> QueryRequest {
        query(marker, "SELECT 1")
    }

    fn query(marker: &str, query_string: &str) -> QueryRequest {
        QueryRequest::new(
            query_string,
            "inventory",
            "primary",
            IdempotencyToken::for_query(marker).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_repeated_token_returns_same_execution() {
        let provider = MockQueryProvider::new();
        let first = provider.start_query(&request("0001")).await.unwrap();
        let second = provider.start_query(&request("0001")).await.unwrap();
        let third = provider.start_query(&request("0002")).await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(provider.requests().len(), 3);
        assert_eq!(provider.execution_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failure_is_consumed_once() {
        let provider = MockQueryProvider::new();
        provider.fail_next(ErrorKind::RateLimited);

        let error = provider.start_query(&request("0001")).await.unwrap_err();
        assert!(error.is_retryable());
        assert!(provider.start_query(&request("0001")).await.is_ok());
    }

    #[tokio::test]
    async fn test_token_reuse_with_changed_query_fails() {
        let provider = MockQueryProvider::new();
        provider.start_query(&query("0001", "SELECT 1")).await.unwrap();

        let error = provider
            .start_query(&query("0001", "SELECT 2"))
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidInput);
        assert_eq!(provider.execution_count(), 1);
    }
}
