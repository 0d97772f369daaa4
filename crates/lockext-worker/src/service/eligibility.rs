//! Eligibility query submission for a new inventory partition.

use std::sync::Arc;

use lockext_core::{IdempotencyToken, Partition, Result, RetentionPolicy, TriggerEvent};
use lockext_query::{EligibilityQuery, QueryExecution, QueryRequest, QueryService};

use super::{Clock, PipelineConfig, PipelineState};

const TRACING_TARGET: &str = "lockext_worker::eligibility";

/// Starts the eligibility query for the partition an event points at.
///
/// The query runs asynchronously; its result object triggers the manifest
/// stage later. The request token comes from the event sequencer and the
/// cutoff from the event time, so every redelivery of the same event
/// resubmits an identical request.
#[derive(Debug, Clone)]
pub struct EligibilityQuerySubmitter {
    query: QueryService,
    config: Arc<PipelineConfig>,
    policy: RetentionPolicy,
    clock: Clock,
}

impl EligibilityQuerySubmitter {
    /// Creates a submitter from explicit handles.
    pub fn new(query: QueryService, config: Arc<PipelineConfig>, clock: Clock) -> Self {
        let policy = config.retention_policy();
        Self {
            query,
            config,
            policy,
            clock,
        }
    }

    /// Creates a submitter sharing the pipeline state.
    pub fn from_state(state: &PipelineState) -> Self {
        Self::new(state.query.clone(), state.config.clone(), state.clock)
    }

    /// Builds the query request for `event` without submitting it.
    pub fn build_request(&self, event: &TriggerEvent) -> Result<QueryRequest> {
        let partition = Partition::from_key(&event.object.key)?;
        let cutoff = self.policy.cutoff(self.clock.event_now(event));

        let query = EligibilityQuery::builder()
            .with_database(self.config.catalog_database.as_str())
            .with_table(self.config.catalog_table.as_str())
            .with_target_bucket(self.config.target_bucket.as_str())
            .with_partition(partition)
            .with_cutoff(cutoff)
            .build()?;

        let token = IdempotencyToken::for_query(&event.sequencer)?;
        Ok(query.into_request(self.config.query_workgroup.as_str(), token))
    }

    /// Builds and submits the eligibility query for `event`.
    #[tracing::instrument(
        skip(self, event),
        fields(bucket = %event.object.bucket, key = %event.object.key, sequencer = %event.sequencer),
        target = TRACING_TARGET
    )]
    pub async fn submit_eligibility_query(&self, event: &TriggerEvent) -> Result<QueryExecution> {
        let request = self.build_request(event)?;
        let execution = self.query.start_query(&request).await?;

        tracing::info!(
            target: TRACING_TARGET,
            execution_id = %execution.execution_id,
            token = %request.client_request_token,
            "Eligibility query submitted"
        );

        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use lockext_core::{ErrorKind, ObjectRef};
    use lockext_test::MockQueryProvider;

    use super::*;
    use crate::service::pipeline_config;

    fn submitter(provider: &MockQueryProvider) -> EligibilityQuerySubmitter {
        let now: Timestamp = "2024-06-01T10:15:30Z".parse().unwrap();
        EligibilityQuerySubmitter::new(
            provider.service(),
            Arc::new(pipeline_config()),
            Clock::Fixed(now),
        )
    }

    fn event(key: &str) -> TriggerEvent {
        TriggerEvent::new(ObjectRef::new("inventory", key), "0000001A2B")
    }

    #[test]
    fn test_cutoff_follows_event_time() {
        let provider = MockQueryProvider::new();
        let event = event("hive/dt=2024-06-01/part-0000.csv")
            .with_event_time("2024-06-02T00:00:01Z".parse().unwrap());

        let request = submitter(&provider).build_request(&event).unwrap();
        assert!(request.query_string.contains("CAST('2025-06-09' AS timestamp)"));
    }

    #[test]
    fn test_builds_partition_scoped_request() {
        let provider = MockQueryProvider::new();
        let request = submitter(&provider)
            .build_request(&event("hive/dt=2024-06-01/part-0000.csv"))
            .unwrap();

        assert_eq!(request.database, "inventory_db");
        assert_eq!(request.workgroup, "lockext");
        assert!(request.query_string.contains("FROM \"inventory_db\".\"inventory_tbl\""));
        assert!(request.query_string.contains("WHERE dt = '2024-06-01'"));
        assert!(request.query_string.contains("CAST('2025-06-08' AS timestamp)"));
        assert!(request.query_string.contains("bucket AS \"locked-data\""));
        assert_eq!(
            request.client_request_token.as_str(),
            "0000001A2B-0000001A2B-0000001A2B"
        );
    }

    #[test]
    fn test_rejects_key_without_partition() {
        let provider = MockQueryProvider::new();
        let error = submitter(&provider)
            .build_request(&event("flat/part-0000.csv"))
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_submits_once_per_call() {
        let provider = MockQueryProvider::new();
        let execution = submitter(&provider)
            .submit_eligibility_query(&event("hive/dt=2024-06-01/part-0000.csv"))
            .await
            .unwrap();

        assert_eq!(execution.execution_id, "execution-1");
        assert_eq!(provider.requests().len(), 1);
    }
}
