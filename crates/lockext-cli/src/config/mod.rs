//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── pipeline: PipelineConfig  # Catalog, buckets, retention, job settings
//! ├── worker: WorkerConfig      # NATS connection, consumers, concurrency
//! ├── aws: AwsConfig            # SDK endpoint and retry policy
//! ├── s3: S3Config              # Manifest reads
//! └── command: Command          # serve | invoke | health
//! ```
//!
//! All configuration can be provided via CLI arguments or environment
//! variables. Use `--help` to see all available options.

mod aws;
mod provider;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use lockext_object::S3Config;
use lockext_worker::{PipelineConfig, WorkerConfig};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use self::aws::AwsConfig;
pub use self::provider::create_state;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "lockext")]
#[command(about = "Extends object-lock retention ahead of expiry")]
#[command(version)]
pub struct Cli {
    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    #[serde(default)]
    pub log_format: LogFormat,

    /// Catalog, bucket, retention and job settings.
    #[clap(flatten)]
    pub pipeline: PipelineConfig,

    /// NATS connection and stage consumer settings.
    #[clap(flatten)]
    pub worker: WorkerConfig,

    /// AWS SDK settings shared by the query and job clients.
    #[clap(flatten)]
    pub aws: AwsConfig,

    /// Object storage settings used to read manifests.
    #[clap(flatten)]
    pub s3: S3Config,

    /// What to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand, Serialize, Deserialize)]
pub enum Command {
    /// Runs both stage workers until interrupted.
    Serve,
    /// Runs one stage once against a notification document.
    Invoke {
        /// Stage to run.
        #[arg(value_enum)]
        stage: StageKind,
        /// Path to the notification JSON document.
        #[arg(long)]
        event: PathBuf,
    },
    /// Probes the query engine, the job engine and NATS.
    Health,
}

/// Pipeline stage selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Partition event to eligibility query.
    Query,
    /// Query result to retention job.
    Manifest,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with `RUST_LOG` filtering, falling back to `info`.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);

        match self.log_format {
            LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
            LogFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json())
                .init(),
        }
    }

    /// Logs configuration (no credentials).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            database = %self.pipeline.catalog_database,
            table = %self.pipeline.catalog_table,
            workgroup = %self.pipeline.query_workgroup,
            target_bucket = %self.pipeline.target_bucket,
            min_retention_days = self.pipeline.min_retention_days,
            safety_margin_days = self.pipeline.safety_margin_days,
            retention_buffer_days = self.pipeline.retention_buffer_days,
            region = %self.pipeline.region,
            "Pipeline configuration"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            nats_url = %self.worker.nats.nats_url,
            max_concurrent_messages = self.worker.max_concurrent_messages,
            max_deliver = self.worker.max_deliver,
            aws_endpoint = ?self.aws.aws_endpoint,
            aws_max_attempts = self.aws.aws_max_attempts,
            "Worker configuration"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    const REQUIRED: &[&str] = &[
        "lockext",
        "--catalog-database",
        "inventory_db",
        "--catalog-table",
        "inventory_tbl",
        "--query-workgroup",
        "lockext",
        "--target-bucket",
        "locked-data",
        "--min-retention-days",
        "365",
        "--safety-margin-days",
        "7",
        "--retention-buffer-days",
        "2",
        "--batch-role-arn",
        "arn:aws:iam::123456789012:role/batch-ops",
        "--report-bucket",
        "batch-reports",
        "--report-prefix",
        "lockext",
        "--account-id",
        "123456789012",
        "--region",
        "us-east-1",
    ];

    fn parse(extra: &[&str]) -> Cli {
        let args = REQUIRED.iter().chain(extra).copied();
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_invoke() {
        let cli = parse(&["invoke", "manifest", "--event", "event.json"]);
        match cli.command {
            Command::Invoke { stage, event } => {
                assert_eq!(stage, StageKind::Manifest);
                assert_eq!(event, PathBuf::from("event.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.pipeline.manifest_probe_bytes, 10_241);
        assert_eq!(cli.pipeline.job_priority, 10);
    }

    #[test]
    fn test_parses_json_log_format() {
        let cli = parse(&["--log-format", "json", "serve"]);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Command::Serve));
        assert_eq!(cli.aws.aws_max_attempts, 3);
    }
}
