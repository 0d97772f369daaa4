//! End-to-end stage behavior against recording fakes.

use std::time::Duration;

use jiff::Timestamp;
use lockext_batch::RetentionMode;
use lockext_core::ErrorKind;
use lockext_test::{InMemoryStores, MockBatchJobProvider, MockQueryProvider};
use lockext_worker::{
    Clock, Disposition, ManifestStage, PipelineConfig, PipelineState, QueryStage, Stage,
};
use serde_json::{Value, json};

const EVENT_TIME: &str = "2024-06-01T10:15:30Z";
/// Far from the event time, so a date derived from the clock stands out.
const CLOCK_TIME: &str = "2031-01-15T00:00:00Z";
const RESULTS_BUCKET: &str = "query-results";
const MANIFEST_KEY: &str = "athena-query-results/8f2c41e0.csv";
const HEADER: &str = "\"locked-data\",\"my_key\"\n";

struct Harness {
    query: MockQueryProvider,
    batch: MockBatchJobProvider,
    stores: InMemoryStores,
    state: PipelineState,
}

impl Harness {
    fn new() -> Self {
        let now: Timestamp = CLOCK_TIME.parse().unwrap();
        Self::with_clock(Clock::Fixed(now))
    }

    fn with_clock(clock: Clock) -> Self {
        let config = PipelineConfig {
            catalog_database: "inventory_db".to_owned(),
            catalog_table: "inventory_tbl".to_owned(),
            query_workgroup: "lockext".to_owned(),
            target_bucket: "locked-data".to_owned(),
            min_retention_days: 365,
            safety_margin_days: 7,
            retention_buffer_days: 2,
            batch_role_arn: "arn:aws:iam::123456789012:role/batch-ops".to_owned(),
            report_bucket: "batch-reports".to_owned(),
            report_prefix: "lockext".to_owned(),
            account_id: "123456789012".to_owned(),
            region: "us-east-1".to_owned(),
            manifest_probe_bytes: 10_241,
            job_priority: 10,
        };

        let query = MockQueryProvider::new();
        let batch = MockBatchJobProvider::new();
        let stores = InMemoryStores::new();

        let state = PipelineState::new(config, query.service(), batch.service(), stores.clone())
            .unwrap()
            .with_clock(clock);

        Self {
            query,
            batch,
            stores,
            state,
        }
    }

    fn query_stage(&self) -> Stage {
        Stage::Query(QueryStage::from_state(&self.state))
    }

    fn manifest_stage(&self) -> Stage {
        Stage::Manifest(ManifestStage::from_state(&self.state))
    }

    async fn put_manifest(&self, data_rows: usize) {
        self.put_manifest_at(MANIFEST_KEY, data_rows).await;
    }

    async fn put_manifest_at(&self, key: &str, data_rows: usize) {
        let mut body = HEADER.to_owned();
        for row in 0..data_rows {
            body.push_str(&format!("\"locked-data\",\"objects/{row:04}.bin\"\n"));
        }
        self.stores
            .put(RESULTS_BUCKET, key, body)
            .await
            .unwrap();
    }
}

fn record(event_name: &str, bucket: &str, key: &str, sequencer: &str) -> Value {
    json!({
        "eventVersion": "2.1",
        "eventSource": "aws:s3",
        "eventTime": EVENT_TIME,
        "eventName": event_name,
        "s3": {
            "bucket": { "name": bucket },
            "object": { "key": key, "size": 1024, "sequencer": sequencer }
        }
    })
}

fn batch(records: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec(&json!({ "Records": records })).unwrap()
}

fn notification(event_name: &str, bucket: &str, key: &str, sequencer: &str) -> Vec<u8> {
    batch(vec![record(event_name, bucket, key, sequencer)])
}

fn created(bucket: &str, key: &str, sequencer: &str) -> Vec<u8> {
    notification("ObjectCreated:Put", bucket, key, sequencer)
}

#[tokio::test]
async fn test_partition_event_starts_scoped_query() {
    let harness = Harness::new();
    let payload = created(
        "inventory",
        "athena-query-results/dt=2024-06-01/result.csv",
        "0000001A2B",
    );

    let disposition = harness.query_stage().handle_payload(&payload).await;
    assert_eq!(disposition, Disposition::Ack);

    let requests = harness.query.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.database, "inventory_db");
    assert_eq!(request.workgroup, "lockext");
    assert!(request.query_string.contains("FROM \"inventory_db\".\"inventory_tbl\""));
    assert!(request.query_string.contains("WHERE dt = '2024-06-01'"));
    assert!(request.query_string.contains("CAST('2025-06-08' AS timestamp)"));
    assert_eq!(
        request.client_request_token.as_str(),
        "0000001A2B-0000001A2B-0000001A2B"
    );
}

#[tokio::test]
async fn test_encoded_partition_key_is_decoded() {
    let harness = Harness::new();
    let payload = created("inventory", "hive/dt%3D2024-06-01/part+0000.csv", "0000001A2C");

    harness.query_stage().handle_payload(&payload).await;

    let requests = harness.query.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].query_string.contains("WHERE dt = '2024-06-01'"));
}

#[tokio::test]
async fn test_header_only_manifest_submits_no_job() {
    let harness = Harness::new();
    harness.put_manifest(0).await;

    let payload = created(RESULTS_BUCKET, MANIFEST_KEY, "0055AED6B3C2D1E0");
    let disposition = harness.manifest_stage().handle_payload(&payload).await;

    assert_eq!(disposition, Disposition::Ack);
    assert!(harness.batch.requests().is_empty());
}

#[tokio::test]
async fn test_manifest_with_rows_submits_retention_job() {
    let harness = Harness::new();
    harness.put_manifest(5).await;

    let payload = created(RESULTS_BUCKET, MANIFEST_KEY, "0055AED6B3C2D1E0");
    let disposition = harness.manifest_stage().handle_payload(&payload).await;
    assert_eq!(disposition, Disposition::Ack);

    let requests = harness.batch.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let expected: Timestamp = "2025-06-03T10:15:30Z".parse().unwrap();
    assert_eq!(request.operation.retain_until, expected);
    assert_eq!(request.operation.mode, RetentionMode::Compliance);
    assert!(request.operation.bypass_governance_retention);
    assert_eq!(
        request.manifest.object_arn.as_str(),
        "arn:aws:s3:::query-results/athena-query-results/8f2c41e0.csv"
    );
    assert!(!request.manifest.etag.is_empty());
    assert_eq!(request.client_request_token.as_str(), "0055AED6B3C2D1E0");
    assert_eq!(harness.batch.job_count(), 1);
}

#[tokio::test]
async fn test_redelivered_partition_event_reuses_token() {
    let harness = Harness::new();
    let payload = created("inventory", "hive/dt=2024-06-01/part-0000.csv", "0000001A2B");

    let stage = harness.query_stage();
    stage.handle_payload(&payload).await;
    stage.handle_payload(&payload).await;

    let requests = harness.query.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].client_request_token,
        requests[1].client_request_token
    );
    assert_eq!(harness.query.execution_count(), 1);
}

#[tokio::test]
async fn test_redelivered_manifest_event_creates_one_job() {
    let harness = Harness::new();
    harness.put_manifest(3).await;

    let payload = created(RESULTS_BUCKET, MANIFEST_KEY, "0055AED6B3C2D1E0");
    let stage = harness.manifest_stage();
    stage.handle_payload(&payload).await;
    stage.handle_payload(&payload).await;

    assert_eq!(harness.batch.requests().len(), 2);
    assert_eq!(harness.batch.job_count(), 1);
}

#[tokio::test]
async fn test_query_failures_are_acknowledged() {
    let harness = Harness::new();
    harness.query.fail_next(ErrorKind::ServiceUnavailable);

    let payload = created("inventory", "hive/dt=2024-06-01/part-0000.csv", "0000001A2B");
    let disposition = harness.query_stage().handle_payload(&payload).await;

    assert_eq!(disposition, Disposition::Ack);
    assert_eq!(harness.query.execution_count(), 0);
}

#[tokio::test]
async fn test_unreadable_manifest_is_retried() {
    let harness = Harness::new();

    let payload = created(RESULTS_BUCKET, MANIFEST_KEY, "0055AED6B3C2D1E0");
    let disposition = harness.manifest_stage().handle_payload(&payload).await;

    assert_eq!(disposition, Disposition::Retry);
    assert!(harness.batch.requests().is_empty());
}

#[tokio::test]
async fn test_transient_job_failure_is_retried_with_same_token() {
    let harness = Harness::new();
    harness.put_manifest(2).await;
    harness.batch.fail_next(ErrorKind::RateLimited);

    let payload = created(RESULTS_BUCKET, MANIFEST_KEY, "0055AED6B3C2D1E0");
    let stage = harness.manifest_stage();

    assert_eq!(stage.handle_payload(&payload).await, Disposition::Retry);
    assert_eq!(stage.handle_payload(&payload).await, Disposition::Ack);

    let requests = harness.batch.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].client_request_token,
        requests[1].client_request_token
    );
    assert_eq!(harness.batch.job_count(), 1);
}

#[tokio::test]
async fn test_permanent_job_failure_is_acknowledged() {
    let harness = Harness::new();
    harness.put_manifest(2).await;
    harness.batch.fail_next(ErrorKind::Authorization);

    let payload = created(RESULTS_BUCKET, MANIFEST_KEY, "0055AED6B3C2D1E0");
    let disposition = harness.manifest_stage().handle_payload(&payload).await;

    assert_eq!(disposition, Disposition::Ack);
    assert_eq!(harness.batch.job_count(), 0);
}

#[tokio::test]
async fn test_unknown_manifest_origin_is_acknowledged() {
    let harness = Harness::new();
    harness
        .stores
        .put(RESULTS_BUCKET, "exports/rows.csv", format!("{HEADER}\"locked-data\",\"a\"\n"))
        .await
        .unwrap();

    let payload = created(RESULTS_BUCKET, "exports/rows.csv", "0055AED6B3C2D1E1");
    let disposition = harness.manifest_stage().handle_payload(&payload).await;

    assert_eq!(disposition, Disposition::Ack);
    assert!(harness.batch.requests().is_empty());
}

#[tokio::test]
async fn test_ignores_non_creation_events() {
    let harness = Harness::new();
    let payload = notification(
        "ObjectRemoved:Delete",
        "inventory",
        "hive/dt=2024-06-01/part-0000.csv",
        "0000001A2B",
    );

    assert_eq!(
        harness.query_stage().handle_payload(&payload).await,
        Disposition::Ack
    );
    assert!(harness.query.requests().is_empty());
}

#[tokio::test]
async fn test_event_without_records_is_acknowledged() {
    let harness = Harness::new();
    let payload = br#"{"Service":"Amazon S3","Event":"s3:TestEvent","Bucket":"inventory"}"#;

    assert_eq!(
        harness.manifest_stage().handle_payload(payload).await,
        Disposition::Ack
    );
}

#[tokio::test]
async fn test_garbage_payload_is_rejected() {
    let harness = Harness::new();
    assert_eq!(
        harness.query_stage().handle_payload(b"not json").await,
        Disposition::Reject
    );
}

#[tokio::test]
async fn test_event_without_time_uses_clock() {
    let harness = Harness::new();
    let mut record = record(
        "ObjectCreated:Put",
        "inventory",
        "hive/dt=2024-06-01/part-0000.csv",
        "0000001A2B",
    );
    record.as_object_mut().unwrap().remove("eventTime");

    harness.query_stage().handle_payload(&batch(vec![record])).await;

    let requests = harness.query.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].query_string.contains("CAST('2032-01-22' AS timestamp)"));
}

#[tokio::test]
async fn test_redelivery_on_system_clock_sends_identical_requests() {
    let harness = Harness::with_clock(Clock::System);
    harness.put_manifest(2).await;

    let partition = created("inventory", "hive/dt=2024-06-01/part-0000.csv", "0000001A2B");
    let manifest = created(RESULTS_BUCKET, MANIFEST_KEY, "0055AED6B3C2D1E0");
    let query_stage = harness.query_stage();
    let manifest_stage = harness.manifest_stage();

    for _ in 0..2 {
        assert_eq!(query_stage.handle_payload(&partition).await, Disposition::Ack);
        assert_eq!(manifest_stage.handle_payload(&manifest).await, Disposition::Ack);
        std::thread::sleep(Duration::from_millis(20));
    }

    let queries = harness.query.requests();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0], queries[1]);
    assert_eq!(harness.query.execution_count(), 1);

    let jobs = harness.batch.requests();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0], jobs[1]);
    assert_eq!(harness.batch.job_count(), 1);
}

#[tokio::test]
async fn test_each_record_gets_its_own_query() {
    let harness = Harness::new();
    let payload = batch(vec![
        record(
            "ObjectCreated:Put",
            "inventory",
            "hive/dt=2024-06-01/part-0000.csv",
            "0000001A2B",
        ),
        record(
            "ObjectCreated:Put",
            "inventory",
            "hive/dt=2024-06-02/part-0000.csv",
            "0000001A2C",
        ),
    ]);

    let disposition = harness.query_stage().handle_payload(&payload).await;
    assert_eq!(disposition, Disposition::Ack);

    let requests = harness.query.requests();
    assert_eq!(requests.len(), 2);
    assert_ne!(
        requests[0].client_request_token,
        requests[1].client_request_token
    );
    assert!(requests[0].query_string.contains("WHERE dt = '2024-06-01'"));
    assert!(requests[1].query_string.contains("WHERE dt = '2024-06-02'"));
    assert_eq!(harness.query.execution_count(), 2);
}

#[tokio::test]
async fn test_one_transient_record_retries_whole_notification() {
    let harness = Harness::new();
    let first_key = "athena-query-results/first.csv";
    let second_key = "athena-query-results/second.csv";
    harness.put_manifest_at(first_key, 2).await;
    harness.put_manifest_at(second_key, 4).await;
    harness.batch.fail_next(ErrorKind::ServiceUnavailable);

    let payload = batch(vec![
        record("ObjectCreated:Put", RESULTS_BUCKET, first_key, "0055AED6B3C2D1E0"),
        record("ObjectCreated:Put", RESULTS_BUCKET, second_key, "0055AED6B3C2D1E1"),
    ]);
    let stage = harness.manifest_stage();

    assert_eq!(stage.handle_payload(&payload).await, Disposition::Retry);
    assert_eq!(harness.batch.job_count(), 1);

    assert_eq!(stage.handle_payload(&payload).await, Disposition::Ack);
    assert_eq!(harness.batch.job_count(), 2);

    // Attempt order: first (failed), second, first, second.
    let requests = harness.batch.requests();
    assert_eq!(requests.len(), 4);
    assert_ne!(
        requests[0].client_request_token,
        requests[1].client_request_token
    );
    assert_eq!(requests[0], requests[2]);
    assert_eq!(requests[1], requests[3]);
}
