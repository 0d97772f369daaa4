//! S3-compatible provider using [`object_store::aws::AmazonS3Builder`].
//!
//! Works with AWS S3, MinIO, and any S3-compatible service. Credentials
//! come from the standard `AWS_*` environment variables or the instance
//! and container credential endpoints.

#[cfg(feature = "config")]
use clap::Args;
use lockext_core::{Error, ErrorKind, Result};
use object_store::RetryConfig;
use object_store::aws::AmazonS3Builder;
use serde::{Deserialize, Serialize};

use crate::{ObjectStoreClient, ObjectStoreProvider, TRACING_TARGET};

/// Default number of retries for transient storage failures.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Connection settings for the S3 provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct S3Config {
    /// Region of the buckets; falls back to `AWS_REGION`.
    #[cfg_attr(feature = "config", arg(long = "s3-region", env = "S3_REGION"))]
    pub s3_region: Option<String>,

    /// Endpoint override (e.g. `http://localhost:9000` for MinIO).
    #[cfg_attr(feature = "config", arg(long = "s3-endpoint", env = "S3_ENDPOINT"))]
    pub s3_endpoint: Option<String>,

    /// Maximum retries for transient failures.
    #[cfg_attr(
        feature = "config",
        arg(long = "s3-max-retries", env = "S3_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)
    )]
    #[serde(default = "default_max_retries")]
    pub s3_max_retries: usize,
}

fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}

impl S3Config {
    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.s3_region = Some(region.into());
        self
    }

    /// Sets an endpoint override.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.s3_endpoint = Some(endpoint.into());
        self
    }
}

/// Builds S3 clients on demand, one per bucket.
#[derive(Debug, Clone)]
pub struct S3Provider {
    config: S3Config,
}

impl S3Provider {
    /// Creates a provider from its configuration.
    pub fn new(config: S3Config) -> Self {
        Self { config }
    }
}

impl ObjectStoreProvider for S3Provider {
    fn client(&self, bucket: &str) -> Result<ObjectStoreClient> {
        let retry = RetryConfig {
            max_retries: self.config.s3_max_retries,
            ..Default::default()
        };

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_retry(retry);

        if let Some(region) = &self.config.s3_region {
            builder = builder.with_region(region);
        }

        if let Some(endpoint) = &self.config.s3_endpoint {
            builder = builder.with_endpoint(endpoint);
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }

        let store = builder.build().map_err(|err| {
            Error::from_source(ErrorKind::Configuration, err)
                .with_message("Failed to build S3 client")
                .with_context(bucket.to_owned())
        })?;

        tracing::trace!(target: TRACING_TARGET, bucket, "Built S3 client");
        Ok(ObjectStoreClient::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_client_for_bucket() {
        let provider = S3Provider::new(
            S3Config::default()
                .with_region("eu-west-1")
                .with_endpoint("http://localhost:9000"),
        );
        assert!(provider.client("query-results").is_ok());
    }
}
