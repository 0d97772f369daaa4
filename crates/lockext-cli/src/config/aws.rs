//! AWS SDK configuration shared by the query and job clients.

use anyhow::{Result as AnyhowResult, anyhow};
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default attempts per SDK call, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// SDK endpoint and retry settings.
///
/// Credentials come from the default provider chain. The region is taken
/// from the pipeline configuration so every client talks to the same one.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct AwsConfig {
    /// Endpoint override for every AWS client (e.g. a local emulator).
    #[arg(long = "aws-endpoint", env = "AWS_ENDPOINT_URL")]
    pub aws_endpoint: Option<String>,

    /// Attempts per call under the standard retry policy.
    #[arg(long = "aws-max-attempts", env = "AWS_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    #[serde(default = "default_max_attempts")]
    pub aws_max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            aws_endpoint: None,
            aws_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl AwsConfig {
    /// Validates the retry and endpoint settings.
    pub fn validate(&self) -> AnyhowResult<()> {
        if !(1..=10).contains(&self.aws_max_attempts) {
            return Err(anyhow!(
                "AWS max attempts {} is invalid. Must be between 1 and 10.",
                self.aws_max_attempts
            ));
        }

        if let Some(endpoint) = &self.aws_endpoint
            && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(anyhow!("AWS endpoint '{endpoint}' must be an http(s) URL"));
        }

        Ok(())
    }

    /// Loads the shared SDK configuration for `region`.
    pub async fn load(&self, region: &str) -> SdkConfig {
        let retry = RetryConfig::standard().with_max_attempts(self.aws_max_attempts);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .retry_config(retry);

        if let Some(endpoint) = &self.aws_endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        loader.load().await
    }
}
