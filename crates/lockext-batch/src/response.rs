//! Job submission response.

use serde::{Deserialize, Serialize};

/// Identifiers returned by an accepted job submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReceipt {
    /// Identifier of the created job.
    pub job_id: String,
    /// Request identifier assigned by the service.
    pub request_id: Option<String>,
    /// Extended request identifier, used by support for tracing.
    pub extended_request_id: Option<String>,
}

impl JobReceipt {
    /// Creates a receipt with only the job identifier.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            request_id: None,
            extended_request_id: None,
        }
    }

    /// Sets the request identifiers.
    #[must_use]
    pub fn with_request_ids(
        mut self,
        request_id: Option<String>,
        extended_request_id: Option<String>,
    ) -> Self {
        self.request_id = request_id;
        self.extended_request_id = extended_request_id;
        self
    }
}
