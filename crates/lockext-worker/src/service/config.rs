//! Pipeline and worker configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use lockext_core::{Error, Result, RetentionPolicy};
use lockext_nats::{ConsumerConfig, EventStream, NatsConfig, StorageEventStream};
use serde::{Deserialize, Serialize};

/// Default manifest probe size: the byte range `0..=10240`.
pub const DEFAULT_MANIFEST_PROBE_BYTES: u64 = 10_241;

/// Default bulk job priority.
pub const DEFAULT_JOB_PRIORITY: i32 = 10;

/// Smallest accepted manifest probe.
pub const MIN_MANIFEST_PROBE_BYTES: u64 = 1024;

/// Largest accepted manifest probe.
pub const MAX_MANIFEST_PROBE_BYTES: u64 = 1024 * 1024;

/// Default maximum messages a stage worker handles at once.
pub const DEFAULT_MAX_CONCURRENT_MESSAGES: usize = 10;

/// Process-wide pipeline settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct PipelineConfig {
    /// Catalog database holding the inventory table.
    #[cfg_attr(
        feature = "config",
        arg(long = "catalog-database", env = "CATALOG_DATABASE")
    )]
    pub catalog_database: String,

    /// Inventory table queried for eligible objects.
    #[cfg_attr(feature = "config", arg(long = "catalog-table", env = "CATALOG_TABLE"))]
    pub catalog_table: String,

    /// Workgroup the eligibility query runs in.
    #[cfg_attr(
        feature = "config",
        arg(long = "query-workgroup", env = "QUERY_WORKGROUP")
    )]
    pub query_workgroup: String,

    /// Bucket whose objects get their retention extended.
    #[cfg_attr(feature = "config", arg(long = "target-bucket", env = "TARGET_BUCKET"))]
    pub target_bucket: String,

    /// Minimum retention every object must keep, in days.
    #[cfg_attr(
        feature = "config",
        arg(long = "min-retention-days", env = "MIN_RETENTION_DAYS")
    )]
    pub min_retention_days: u32,

    /// Extra days added to the eligibility cutoff.
    #[cfg_attr(
        feature = "config",
        arg(long = "safety-margin-days", env = "SAFETY_MARGIN_DAYS")
    )]
    pub safety_margin_days: u32,

    /// Extra days added to the applied retain-until date.
    #[cfg_attr(
        feature = "config",
        arg(long = "retention-buffer-days", env = "RETENTION_BUFFER_DAYS")
    )]
    pub retention_buffer_days: u32,

    /// Role the bulk job assumes.
    #[cfg_attr(
        feature = "config",
        arg(long = "batch-role-arn", env = "BATCH_ROLE_ARN")
    )]
    pub batch_role_arn: String,

    /// Bucket receiving bulk job completion reports.
    #[cfg_attr(feature = "config", arg(long = "report-bucket", env = "REPORT_BUCKET"))]
    pub report_bucket: String,

    /// Key prefix for completion reports.
    #[cfg_attr(feature = "config", arg(long = "report-prefix", env = "REPORT_PREFIX"))]
    pub report_prefix: String,

    /// Account that owns the bulk jobs.
    #[cfg_attr(feature = "config", arg(long = "account-id", env = "ACCOUNT_ID"))]
    pub account_id: String,

    /// Region of the bucket, catalog and job services.
    #[cfg_attr(feature = "config", arg(long = "region", env = "AWS_REGION"))]
    pub region: String,

    /// Bytes read from the start of a manifest to decide whether it has rows.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "manifest-probe-bytes",
            env = "MANIFEST_PROBE_BYTES",
            default_value_t = DEFAULT_MANIFEST_PROBE_BYTES
        )
    )]
    #[serde(default = "default_manifest_probe_bytes")]
    pub manifest_probe_bytes: u64,

    /// Priority of submitted bulk jobs.
    #[cfg_attr(
        feature = "config",
        arg(long = "job-priority", env = "JOB_PRIORITY", default_value_t = DEFAULT_JOB_PRIORITY)
    )]
    #[serde(default = "default_job_priority")]
    pub job_priority: i32,
}

fn default_manifest_probe_bytes() -> u64 {
    DEFAULT_MANIFEST_PROBE_BYTES
}

fn default_job_priority() -> i32 {
    DEFAULT_JOB_PRIORITY
}

impl PipelineConfig {
    /// Day counts as a [`RetentionPolicy`].
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(
            self.min_retention_days,
            self.safety_margin_days,
            self.retention_buffer_days,
        )
    }

    /// Checks every setting, failing on the first invalid one.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("catalog_database", &self.catalog_database),
            ("catalog_table", &self.catalog_table),
            ("query_workgroup", &self.query_workgroup),
            ("target_bucket", &self.target_bucket),
            ("batch_role_arn", &self.batch_role_arn),
            ("report_bucket", &self.report_bucket),
            ("report_prefix", &self.report_prefix),
            ("account_id", &self.account_id),
            ("region", &self.region),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::configuration(format!("{name} must not be empty"))
                    .with_context(name));
            }
        }

        if self.account_id.len() != 12 || !self.account_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::configuration(format!(
                "account_id must be 12 digits, got '{}'",
                self.account_id
            ))
            .with_context("account_id"));
        }

        if !self.batch_role_arn.starts_with("arn:") {
            return Err(Error::configuration(format!(
                "batch_role_arn must be an ARN, got '{}'",
                self.batch_role_arn
            ))
            .with_context("batch_role_arn"));
        }

        self.retention_policy().validate()?;

        if !(MIN_MANIFEST_PROBE_BYTES..=MAX_MANIFEST_PROBE_BYTES).contains(&self.manifest_probe_bytes)
        {
            return Err(Error::configuration(format!(
                "manifest_probe_bytes must be between {MIN_MANIFEST_PROBE_BYTES} and \
                 {MAX_MANIFEST_PROBE_BYTES}, got {}",
                self.manifest_probe_bytes
            ))
            .with_context("manifest_probe_bytes"));
        }

        if self.job_priority < 0 {
            return Err(Error::configuration(format!(
                "job_priority must not be negative, got {}",
                self.job_priority
            ))
            .with_context("job_priority"));
        }

        Ok(())
    }
}

/// Stage worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct WorkerConfig {
    /// NATS configuration.
    #[cfg_attr(feature = "config", command(flatten))]
    pub nats: NatsConfig,

    /// Maximum messages each stage worker handles simultaneously.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "worker-max-concurrent-messages",
            env = "WORKER_MAX_CONCURRENT_MESSAGES",
            default_value_t = DEFAULT_MAX_CONCURRENT_MESSAGES
        )
    )]
    #[serde(default = "default_max_concurrent_messages")]
    pub max_concurrent_messages: usize,

    /// Durable consumer of the query stage.
    #[cfg_attr(
        feature = "config",
        arg(long = "query-consumer", env = "QUERY_CONSUMER", default_value = "lockext-query")
    )]
    #[serde(default = "default_query_consumer")]
    pub query_consumer: String,

    /// Subject carrying new inventory partition notifications.
    #[cfg_attr(
        feature = "config",
        arg(long = "query-subject", env = "QUERY_SUBJECT", default_value = "storage.events.partitions")
    )]
    #[serde(default = "default_query_subject")]
    pub query_subject: String,

    /// Durable consumer of the manifest stage.
    #[cfg_attr(
        feature = "config",
        arg(long = "manifest-consumer", env = "MANIFEST_CONSUMER", default_value = "lockext-manifest")
    )]
    #[serde(default = "default_manifest_consumer")]
    pub manifest_consumer: String,

    /// Subject carrying query result notifications.
    #[cfg_attr(
        feature = "config",
        arg(long = "manifest-subject", env = "MANIFEST_SUBJECT", default_value = "storage.events.manifests")
    )]
    #[serde(default = "default_manifest_subject")]
    pub manifest_subject: String,

    /// Delivery attempts per message before the server gives up.
    #[cfg_attr(
        feature = "config",
        arg(long = "worker-max-deliver", env = "WORKER_MAX_DELIVER", default_value_t = 5)
    )]
    #[serde(default = "default_max_deliver")]
    pub max_deliver: i64,

    /// Seconds the server waits for an acknowledgement.
    #[cfg_attr(
        feature = "config",
        arg(long = "worker-ack-wait-secs", env = "WORKER_ACK_WAIT_SECS", default_value_t = 300)
    )]
    #[serde(default = "default_ack_wait_secs")]
    pub ack_wait_secs: u64,

    /// Seconds before a message asked to be retried is redelivered.
    #[cfg_attr(
        feature = "config",
        arg(long = "worker-retry-delay-secs", env = "WORKER_RETRY_DELAY_SECS", default_value_t = 30)
    )]
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_max_concurrent_messages() -> usize {
    DEFAULT_MAX_CONCURRENT_MESSAGES
}

fn default_query_consumer() -> String {
    "lockext-query".to_owned()
}

fn default_query_subject() -> String {
    StorageEventStream::subject("partitions")
}

fn default_manifest_consumer() -> String {
    "lockext-manifest".to_owned()
}

fn default_manifest_subject() -> String {
    StorageEventStream::subject("manifests")
}

fn default_max_deliver() -> i64 {
    5
}

fn default_ack_wait_secs() -> u64 {
    300
}

fn default_retry_delay_secs() -> u64 {
    30
}

impl WorkerConfig {
    /// Creates a worker configuration with default consumers and limits.
    pub fn new(nats: NatsConfig) -> Self {
        Self {
            nats,
            max_concurrent_messages: DEFAULT_MAX_CONCURRENT_MESSAGES,
            query_consumer: default_query_consumer(),
            query_subject: default_query_subject(),
            manifest_consumer: default_manifest_consumer(),
            manifest_subject: default_manifest_subject(),
            max_deliver: default_max_deliver(),
            ack_wait_secs: default_ack_wait_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_max_concurrent_messages(mut self, max_concurrent_messages: usize) -> Self {
        self.max_concurrent_messages = max_concurrent_messages;
        self
    }

    /// Delay before a retried message is redelivered.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Consumer settings of the query stage.
    pub fn query_consumer_config(&self) -> ConsumerConfig {
        self.consumer_config(&self.query_consumer, &self.query_subject)
    }

    /// Consumer settings of the manifest stage.
    pub fn manifest_consumer_config(&self) -> ConsumerConfig {
        self.consumer_config(&self.manifest_consumer, &self.manifest_subject)
    }

    fn consumer_config(&self, name: &str, subject: &str) -> ConsumerConfig {
        ConsumerConfig::new(name, subject)
            .with_max_deliver(self.max_deliver)
            .with_ack_wait(Duration::from_secs(self.ack_wait_secs))
    }
}
