//! Provider construction from CLI configuration.

use anyhow::Context;
use lockext_batch::s3control::S3ControlProvider;
use lockext_object::S3Provider;
use lockext_query::athena::AthenaProvider;
use lockext_worker::PipelineState;

use super::Cli;
use crate::TRACING_TARGET_CONFIG;

/// Builds the AWS-backed providers and the pipeline state.
pub async fn create_state(cli: &Cli) -> anyhow::Result<PipelineState> {
    cli.aws.validate().context("invalid AWS configuration")?;

    let region = &cli.pipeline.region;
    let sdk_config = cli.aws.load(region).await;

    let query = AthenaProvider::new(&sdk_config).into_service();
    let batch = S3ControlProvider::new(&sdk_config, cli.pipeline.account_id.clone()).into_service();

    let mut s3_config = cli.s3.clone();
    if s3_config.s3_region.is_none() {
        s3_config = s3_config.with_region(region.clone());
    }
    if s3_config.s3_endpoint.is_none()
        && let Some(endpoint) = &cli.aws.aws_endpoint
    {
        s3_config = s3_config.with_endpoint(endpoint.clone());
    }

    tracing::debug!(
        target: TRACING_TARGET_CONFIG,
        region = %region,
        s3_endpoint = ?s3_config.s3_endpoint,
        "Providers created"
    );

    PipelineState::new(
        cli.pipeline.clone(),
        query,
        batch,
        S3Provider::new(s3_config),
    )
    .context("invalid pipeline configuration")
}
