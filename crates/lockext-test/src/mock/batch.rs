//! Mock bulk job provider.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use lockext_batch::{BatchJobProvider, BatchJobRequest, BatchJobService, JobReceipt};
use lockext_core::{Error, ErrorKind, Result, ServiceHealth};

use super::lock;

#[derive(Debug, Default)]
struct BatchState {
    requests: Vec<BatchJobRequest>,
    jobs: HashMap<String, (String, BatchJobRequest)>,
    failures: VecDeque<ErrorKind>,
}

/// Mock bulk job provider for testing.
///
/// A repeated client request token returns the job created for it first,
/// provided the request is identical. Reusing a token for a different
/// request fails the way the job engine does, with an invalid input error.
#[derive(Debug, Clone, Default)]
pub struct MockBatchJobProvider {
    state: Arc<Mutex<BatchState>>,
}

impl MockBatchJobProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next submission fail with `kind`.
    pub fn fail_next(&self, kind: ErrorKind) {
        lock(&self.state).failures.push_back(kind);
    }

    /// Every submitted request, including failed and repeated ones.
    pub fn requests(&self) -> Vec<BatchJobRequest> {
        lock(&self.state).requests.clone()
    }

    /// Number of distinct jobs created.
    pub fn job_count(&self) -> usize {
        lock(&self.state).jobs.len()
    }

    /// Wraps a clone of this provider into a [`BatchJobService`].
    pub fn service(&self) -> BatchJobService {
        BatchJobService::new(self.clone())
    }
}

#[async_trait::async_trait]
impl BatchJobProvider for MockBatchJobProvider {
    async fn create_job(&self, request: &BatchJobRequest) -> Result<JobReceipt> {
        let mut state = lock(&self.state);
        state.requests.push(request.clone());

        if let Some(kind) = state.failures.pop_front() {
            return Err(Error::new(kind).with_message("Scripted job failure"));
        }

        let next_id = format!("job-{}", state.jobs.len() + 1);
        let (job_id, first) = state
            .jobs
            .entry(request.client_request_token.to_string())
            .or_insert_with(|| (next_id, request.clone()));

        if *first != *request {
            return Err(Error::new(ErrorKind::InvalidInput)
                .with_message("Client request token was reused with a different request")
                .with_context(request.client_request_token.to_string()));
        }
        let job_id = job_id.clone();

        Ok(JobReceipt::new(job_id).with_request_ids(Some("mock-request".to_owned()), None))
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}
