//! Bulk job request types.

use derive_builder::Builder;
use jiff::Timestamp;
use lockext_core::{Arn, Error, IdempotencyToken, ManifestSchema, Result};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Completion report format.
pub const REPORT_FORMAT: &str = "Report_CSV_20180820";

/// Object-lock retention mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetentionMode {
    /// Cannot be shortened or removed by anyone until it expires.
    #[default]
    Compliance,
    /// Can be bypassed by principals with the bypass permission.
    Governance,
}

/// Which tasks the completion report lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
pub enum ReportScope {
    /// Every task, successful or not.
    #[default]
    AllTasks,
    /// Failed tasks only.
    FailedTasksOnly,
}

/// Retention applied to every manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionOperation {
    /// Lock mode to apply.
    pub mode: RetentionMode,
    /// New retain-until instant.
    pub retain_until: Timestamp,
    /// Whether existing governance-mode locks may be overridden.
    pub bypass_governance_retention: bool,
}

impl RetentionOperation {
    /// Compliance-mode retention that overrides governance locks.
    pub fn compliance(retain_until: Timestamp) -> Self {
        Self {
            mode: RetentionMode::Compliance,
            retain_until,
            bypass_governance_retention: true,
        }
    }
}

/// Manifest reference pinned to one version of its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobManifest {
    /// How the manifest is encoded.
    pub schema: ManifestSchema,
    /// ARN of the manifest object.
    pub object_arn: Arn,
    /// Entity tag of the manifest content the job must read.
    pub etag: String,
}

/// Destination and scope of the completion report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    /// ARN of the report bucket.
    pub bucket: Arn,
    /// Key prefix for report objects.
    pub prefix: String,
    /// Whether a report is produced at all.
    pub enabled: bool,
    /// Tasks included in the report.
    pub scope: ReportScope,
}

impl JobReport {
    /// An enabled report covering all tasks.
    pub fn all_tasks(bucket: Arn, prefix: impl Into<String>) -> Self {
        Self {
            bucket,
            prefix: prefix.into(),
            enabled: true,
            scope: ReportScope::AllTasks,
        }
    }
}

/// Tag attached to the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl JobTag {
    /// Creates a tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A complete bulk job submission.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(
    name = "BatchJobRequestBuilder",
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(private, name = "build_inner", validate = "Self::validate")
)]
pub struct BatchJobRequest {
    /// Account that owns the job.
    pub account_id: String,
    /// Operation applied to every manifest entry.
    pub operation: RetentionOperation,
    /// Manifest listing the objects.
    pub manifest: JobManifest,
    /// Completion report settings.
    pub report: JobReport,
    /// Human readable description.
    pub description: String,
    /// Job priority; higher runs first.
    #[builder(default = "10")]
    pub priority: i32,
    /// Role the job assumes while running.
    pub role_arn: String,
    /// Tags attached to the job.
    #[builder(default)]
    pub tags: Vec<JobTag>,
    /// Whether the job waits for manual confirmation before running.
    #[builder(default = "false")]
    pub confirmation_required: bool,
    /// Token deduplicating repeated submissions.
    pub client_request_token: IdempotencyToken,
}

impl BatchJobRequestBuilder {
    /// Builds the request.
    pub fn build(self) -> Result<BatchJobRequest> {
        self.build_inner()
            .map_err(|err| Error::invalid_input(err.to_string()))
    }

    /// Appends one tag.
    #[must_use]
    pub fn with_tag(mut self, tag: JobTag) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(tag);
        self
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(account_id) = &self.account_id
            && account_id.is_empty()
        {
            return Err("account id is empty".to_owned());
        }

        if let Some(role_arn) = &self.role_arn
            && !role_arn.starts_with("arn:")
        {
            return Err(format!("role '{role_arn}' is not an ARN"));
        }

        if let Some(manifest) = &self.manifest
            && manifest.etag.is_empty()
        {
            return Err("manifest entity tag is empty".to_owned());
        }

        if let Some(priority) = self.priority
            && priority < 0
        {
            return Err(format!("priority must not be negative, got {priority}"));
        }

        Ok(())
    }
}

impl BatchJobRequest {
    /// Creates a builder for this request.
    pub fn builder() -> BatchJobRequestBuilder {
        BatchJobRequestBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use lockext_core::{ErrorKind, ManifestFormat, ObjectRef};

    use super::*;

    fn manifest() -> JobManifest {
        let object = ObjectRef::new("query-results", "athena-query-results/q.csv");
        JobManifest {
            schema: ManifestSchema::new(ManifestFormat::BatchOperationsCsv, Vec::new()),
            object_arn: object.arn(),
            etag: "\"9b2cf535f27731c974343645a3985328\"".to_owned(),
        }
    }

    fn builder() -> BatchJobRequestBuilder {
        let retain_until: Timestamp = "2025-06-03T10:15:30Z".parse().unwrap();
        BatchJobRequest::builder()
            .with_account_id("123456789012")
            .with_operation(RetentionOperation::compliance(retain_until))
            .with_manifest(manifest())
            .with_report(JobReport::all_tasks(Arn::bucket("reports"), "batch-reports"))
            .with_description("Extend retention")
            .with_role_arn("arn:aws:iam::123456789012:role/batch")
            .with_client_request_token(IdempotencyToken::for_batch_job("0055AED6").unwrap())
    }

    #[test]
    fn test_builds_with_defaults() {
        let request = builder()
            .with_tag(JobTag::new("job-created-by", "tests"))
            .build()
            .unwrap();

        assert_eq!(request.priority, 10);
        assert!(!request.confirmation_required);
        assert_eq!(request.tags.len(), 1);
        assert_eq!(request.operation.mode, RetentionMode::Compliance);
        assert!(request.operation.bypass_governance_retention);
        assert_eq!(request.report.scope, ReportScope::AllTasks);
    }

    #[test]
    fn test_rejects_invalid_role() {
        let error = builder().with_role_arn("batch-role").build().unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn test_rejects_missing_token() {
        let mut request = builder();
        request.client_request_token = None;
        assert!(request.build().is_err());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(RetentionMode::Compliance.as_ref(), "COMPLIANCE");
        assert_eq!(ReportScope::AllTasks.as_ref(), "AllTasks");
        assert_eq!(
            serde_json::to_string(&RetentionMode::Governance).unwrap(),
            "\"GOVERNANCE\""
        );
    }
}
