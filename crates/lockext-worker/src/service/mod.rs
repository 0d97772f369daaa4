//! Pipeline components and their shared state.
//!
//! - [`EligibilityQuerySubmitter`] starts the catalog query for a new partition
//! - [`ManifestValidator`] decides whether a query result has any rows
//! - [`BulkRetentionJobSubmitter`] submits the retention job for a manifest

mod clock;
mod config;
mod eligibility;
mod job;
mod manifest;
mod state;

pub use clock::Clock;
pub use config::{
    DEFAULT_JOB_PRIORITY, DEFAULT_MANIFEST_PROBE_BYTES, DEFAULT_MAX_CONCURRENT_MESSAGES,
    MAX_MANIFEST_PROBE_BYTES, MIN_MANIFEST_PROBE_BYTES, PipelineConfig, WorkerConfig,
};
pub use eligibility::EligibilityQuerySubmitter;
pub use job::{BulkRetentionJobSubmitter, JOB_CREATED_BY_TAG, JOB_CREATED_BY_VALUE};
pub use manifest::{ManifestCount, ManifestValidator, count_lines};
pub use state::PipelineState;

#[cfg(test)]
pub(crate) use config::tests::pipeline_config;
