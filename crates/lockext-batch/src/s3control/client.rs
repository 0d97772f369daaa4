//! S3 Control client implementing [`BatchJobProvider`].

use std::sync::Arc;
use std::time::Instant;

use aws_config::SdkConfig;
use aws_sdk_s3control::Client;
use aws_sdk_s3control::operation::RequestId;
use aws_sdk_s3control::primitives::DateTime;
use aws_sdk_s3control::types::{
    JobManifest, JobManifestFieldName, JobManifestFormat, JobManifestLocation, JobManifestSpec,
    JobOperation, JobReport, JobReportFormat, JobReportScope, S3ObjectLockRetentionMode,
    S3Retention, S3SetObjectRetentionOperation, S3Tag,
};
use lockext_core::{Error, ErrorKind, ManifestSchema, Result, ServiceHealth};

use super::TRACING_TARGET;
use super::error::{from_build_error, from_sdk_error};
use crate::{
    BatchJobProvider, BatchJobRequest, BatchJobService, JobReceipt, REPORT_FORMAT, RetentionOperation,
};

struct S3ControlInner {
    client: Client,
    account_id: String,
}

/// S3 Batch Operations job provider.
///
/// Retry behavior comes from the [`SdkConfig`] the provider is built with.
#[derive(Clone)]
pub struct S3ControlProvider {
    inner: Arc<S3ControlInner>,
}

impl std::fmt::Debug for S3ControlProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ControlProvider")
            .field("account_id", &self.inner.account_id)
            .finish_non_exhaustive()
    }
}

impl S3ControlProvider {
    /// Creates a provider from shared AWS configuration.
    ///
    /// `account_id` is used by health checks, which list jobs of that account.
    pub fn new(sdk_config: &SdkConfig, account_id: impl Into<String>) -> Self {
        let config = aws_sdk_s3control::config::Builder::from(sdk_config).build();
        Self::from_client(Client::from_conf(config), account_id)
    }

    /// Creates a provider from a pre-built client.
    pub fn from_client(client: Client, account_id: impl Into<String>) -> Self {
        tracing::debug!(target: TRACING_TARGET, "S3 Control provider created");
        Self {
            inner: Arc::new(S3ControlInner {
                client,
                account_id: account_id.into(),
            }),
        }
    }

    /// Wraps this provider into a [`BatchJobService`].
    pub fn into_service(self) -> BatchJobService {
        BatchJobService::new(self)
    }
}

/// Translates the request into SDK shapes.
struct JobShapes {
    operation: JobOperation,
    manifest: JobManifest,
    report: JobReport,
    tags: Vec<S3Tag>,
}

impl JobShapes {
    fn from_request(request: &BatchJobRequest) -> Result<Self> {
        let put_retention = S3SetObjectRetentionOperation::builder()
            .bypass_governance_retention(request.operation.bypass_governance_retention)
            .retention(retention_shape(&request.operation))
            .build();

        let operation = JobOperation::builder()
            .s3_put_object_retention(put_retention)
            .build();

        let location = JobManifestLocation::builder()
            .object_arn(request.manifest.object_arn.as_str())
            .e_tag(&request.manifest.etag)
            .build()
            .map_err(from_build_error)?;

        let manifest = JobManifest::builder()
            .spec(manifest_spec(&request.manifest.schema)?)
            .location(location)
            .build();

        let tags = request
            .tags
            .iter()
            .map(|tag| {
                S3Tag::builder()
                    .key(&tag.key)
                    .value(&tag.value)
                    .build()
                    .map_err(from_build_error)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            operation,
            manifest,
            report: report_shape(&request.report)?,
            tags,
        })
    }
}

fn retention_shape(operation: &RetentionOperation) -> S3Retention {
    S3Retention::builder()
        .retain_until_date(DateTime::from_secs(operation.retain_until.as_second()))
        .mode(S3ObjectLockRetentionMode::from(operation.mode.as_ref()))
        .build()
}

fn manifest_spec(schema: &ManifestSchema) -> Result<JobManifestSpec> {
    let mut spec = JobManifestSpec::builder().format(JobManifestFormat::from(schema.format.as_ref()));
    for field in &schema.fields {
        spec = spec.fields(JobManifestFieldName::from(field.as_ref()));
    }
    spec.build().map_err(from_build_error)
}

fn report_shape(report: &crate::JobReport) -> Result<JobReport> {
    Ok(JobReport::builder()
        .bucket(report.bucket.as_str())
        .format(JobReportFormat::from(REPORT_FORMAT))
        .enabled(report.enabled)
        .prefix(&report.prefix)
        .report_scope(JobReportScope::from(report.scope.as_ref()))
        .build())
}

#[async_trait::async_trait]
impl BatchJobProvider for S3ControlProvider {
    #[tracing::instrument(
        skip(self, request),
        fields(token = %request.client_request_token),
        target = TRACING_TARGET
    )]
    async fn create_job(&self, request: &BatchJobRequest) -> Result<JobReceipt> {
        let shapes = JobShapes::from_request(request)?;

        let output = self
            .inner
            .client
            .create_job()
            .account_id(&request.account_id)
            .confirmation_required(request.confirmation_required)
            .operation(shapes.operation)
            .report(shapes.report)
            .manifest(shapes.manifest)
            .description(&request.description)
            .priority(request.priority)
            .role_arn(&request.role_arn)
            .set_tags(Some(shapes.tags))
            .client_request_token(request.client_request_token.as_str())
            .send()
            .await
            .map_err(from_sdk_error)?;

        let job_id = output.job_id().ok_or_else(|| {
            Error::new(ErrorKind::ExternalError)
                .with_message("S3 Control accepted the job without a job id")
        })?;

        Ok(JobReceipt::new(job_id).with_request_ids(
            output.request_id().map(str::to_owned),
            // S3 Control does not expose an extended request id.
            None,
        ))
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        let started_at = Instant::now();
        let result = self
            .inner
            .client
            .list_jobs()
            .account_id(&self.inner.account_id)
            .max_results(1)
            .send()
            .await;

        let health = match result {
            Ok(_) => ServiceHealth::healthy(),
            Err(err) => {
                let error = from_sdk_error(err);
                if error.kind == ErrorKind::Authorization {
                    ServiceHealth::degraded(error.to_string())
                } else {
                    ServiceHealth::unhealthy(error.to_string())
                }
            }
        };

        Ok(health.with_response_time(started_at.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use lockext_core::{Arn, IdempotencyToken, ManifestSources, ObjectRef};

    use super::*;
    use crate::{JobManifest as RequestManifest, JobReport as RequestReport, JobTag};

    fn request() -> BatchJobRequest {
        let manifest = ObjectRef::new("query-results", "athena-query-results/q.csv");
        let schema = ManifestSources::default()
            .resolve(&manifest.key)
            .unwrap()
            .schema
            .clone();
        let retain_until: Timestamp = "2025-06-03T10:15:30Z".parse().unwrap();

        BatchJobRequest::builder()
            .with_account_id("123456789012")
            .with_operation(RetentionOperation::compliance(retain_until))
            .with_manifest(RequestManifest {
                schema,
                object_arn: manifest.arn(),
                etag: "\"abc\"".to_owned(),
            })
            .with_report(RequestReport::all_tasks(Arn::bucket("reports"), "lockext"))
            .with_description("Extend retention")
            .with_role_arn("arn:aws:iam::123456789012:role/batch")
            .with_tag(JobTag::new("job-created-by", "tests"))
            .with_client_request_token(IdempotencyToken::for_batch_job("0055AED6").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_retention_is_compliance_until_timestamp() {
        let request = request();
        let retention = retention_shape(&request.operation);

        assert_eq!(retention.mode(), Some(&S3ObjectLockRetentionMode::Compliance));
        assert_eq!(
            retention.retain_until_date(),
            Some(&DateTime::from_secs(1_748_945_730))
        );
    }

    #[test]
    fn test_manifest_spec_lists_fields() {
        let request = request();
        let spec = manifest_spec(&request.manifest.schema).unwrap();
        assert_eq!(
            spec.fields(),
            &[JobManifestFieldName::Bucket, JobManifestFieldName::Key]
        );
    }

    #[test]
    fn test_report_covers_all_tasks() {
        let report = report_shape(&request().report).unwrap();
        assert_eq!(report.report_scope(), Some(&JobReportScope::AllTasks));
        assert_eq!(report.bucket(), Some("arn:aws:s3:::reports"));
        assert_eq!(report.prefix(), Some("lockext"));
    }

    #[test]
    fn test_translates_full_request() {
        let shapes = JobShapes::from_request(&request()).unwrap();
        assert_eq!(shapes.tags.len(), 1);
        assert!(shapes.operation.s3_put_object_retention().is_some());
    }

    #[test]
    fn test_provider_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<S3ControlProvider>();
    }
}
