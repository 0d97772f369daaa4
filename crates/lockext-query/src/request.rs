//! Query submission request and response types.

use lockext_core::IdempotencyToken;
use serde::{Deserialize, Serialize};

/// A query ready to be submitted to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Query text.
    pub query_string: String,
    /// Catalog database the query runs in.
    pub database: String,
    /// Workgroup that owns the execution and its output location.
    pub workgroup: String,
    /// Token deduplicating repeated submissions.
    pub client_request_token: IdempotencyToken,
}

impl QueryRequest {
    /// Creates a new query request.
    pub fn new(
        query_string: impl Into<String>,
        database: impl Into<String>,
        workgroup: impl Into<String>,
        client_request_token: IdempotencyToken,
    ) -> Self {
        Self {
            query_string: query_string.into(),
            database: database.into(),
            workgroup: workgroup.into(),
            client_request_token,
        }
    }
}

/// Handle of an accepted query execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExecution {
    /// Identifier assigned by the engine.
    pub execution_id: String,
}

impl QueryExecution {
    /// Creates an execution handle.
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
        }
    }
}
