//! Bulk retention job submission for a validated manifest.

use std::sync::Arc;

use lockext_batch::{
    BatchJobRequest, BatchJobService, JobManifest, JobReceipt, JobReport, JobTag,
    RetentionOperation,
};
use lockext_core::{
    Arn, Error, ErrorKind, IdempotencyToken, ManifestSources, Result, RetentionPolicy, TriggerEvent,
};
use lockext_object::ObjectStoreProvider;

use super::{Clock, PipelineConfig, PipelineState};

const TRACING_TARGET: &str = "lockext_worker::job";

/// Tag key marking jobs created by this pipeline.
pub const JOB_CREATED_BY_TAG: &str = "job-created-by";

/// Tag value marking jobs created by this pipeline.
pub const JOB_CREATED_BY_VALUE: &str = "Auto Extend Object Lock Solution";

/// Submits a compliance-mode retention job over a manifest.
///
/// The job references the manifest by ARN and entity tag, so it acts on
/// exactly the content that was validated. The token is passed through
/// unchanged; it belongs to the event that announced the manifest.
#[derive(Clone)]
pub struct BulkRetentionJobSubmitter {
    batch: BatchJobService,
    objects: Arc<dyn ObjectStoreProvider>,
    sources: Arc<ManifestSources>,
    config: Arc<PipelineConfig>,
    policy: RetentionPolicy,
    clock: Clock,
}

impl std::fmt::Debug for BulkRetentionJobSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkRetentionJobSubmitter")
            .field("policy", &self.policy)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl BulkRetentionJobSubmitter {
    /// Creates a submitter from explicit handles.
    pub fn new(
        batch: BatchJobService,
        objects: Arc<dyn ObjectStoreProvider>,
        sources: Arc<ManifestSources>,
        config: Arc<PipelineConfig>,
        clock: Clock,
    ) -> Self {
        let policy = config.retention_policy();
        Self {
            batch,
            objects,
            sources,
            config,
            policy,
            clock,
        }
    }

    /// Creates a submitter sharing the pipeline state.
    pub fn from_state(state: &PipelineState) -> Self {
        Self::new(
            state.batch.clone(),
            state.objects.clone(),
            state.sources.clone(),
            state.config.clone(),
            state.clock,
        )
    }

    /// Builds the job request for the manifest announced by `event`, once
    /// its entity tag is known.
    ///
    /// Retain-until is computed from the event time, so a redelivered event
    /// yields the same request under the same token.
    pub fn build_request(
        &self,
        event: &TriggerEvent,
        etag: impl Into<String>,
        token: IdempotencyToken,
    ) -> Result<BatchJobRequest> {
        let manifest = &event.object;
        let source = self.sources.resolve(&manifest.key)?;
        let retain_until = self.policy.retain_until(self.clock.event_now(event))?;

        BatchJobRequest::builder()
            .with_account_id(self.config.account_id.as_str())
            .with_operation(RetentionOperation::compliance(retain_until))
            .with_manifest(JobManifest {
                schema: source.schema.clone(),
                object_arn: manifest.arn(),
                etag: etag.into(),
            })
            .with_report(JobReport::all_tasks(
                Arn::bucket(&self.config.report_bucket),
                self.config.report_prefix.as_str(),
            ))
            .with_description(format!(
                "Auto Extend Object Lock Solution Job for S3Bucket: {}",
                self.config.target_bucket
            ))
            .with_priority(self.config.job_priority)
            .with_role_arn(self.config.batch_role_arn.as_str())
            .with_tag(JobTag::new(JOB_CREATED_BY_TAG, JOB_CREATED_BY_VALUE))
            .with_client_request_token(token)
            .build()
    }

    /// Pins the manifest entity tag and submits the retention job.
    ///
    /// # Errors
    ///
    /// Fails without submitting when the manifest matches no known source,
    /// its metadata cannot be read, or it carries no entity tag.
    #[tracing::instrument(
        skip(self, event, token),
        fields(manifest = %event.object, token = %token),
        target = TRACING_TARGET
    )]
    pub async fn submit_retention_job(
        &self,
        event: &TriggerEvent,
        token: IdempotencyToken,
    ) -> Result<JobReceipt> {
        let manifest = &event.object;
        // Unknown origins fail before any network call.
        self.sources.resolve(&manifest.key)?;

        let client = self.objects.client(&manifest.bucket)?;
        let info = client.head(&manifest.key).await?;
        let etag = info.e_tag.ok_or_else(|| {
            Error::new(ErrorKind::ExternalError)
                .with_message("Manifest metadata has no entity tag")
                .with_context(manifest.to_string())
        })?;

        let request = self.build_request(event, etag, token)?;
        let receipt = self.batch.create_job(&request).await?;

        tracing::info!(
            target: TRACING_TARGET,
            job_id = %receipt.job_id,
            request_id = receipt.request_id.as_deref().unwrap_or("-"),
            extended_request_id = receipt.extended_request_id.as_deref().unwrap_or("-"),
            retain_until = %request.operation.retain_until,
            "Retention job created"
        );

        Ok(receipt)
    }
}
