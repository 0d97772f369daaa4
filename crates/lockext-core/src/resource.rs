//! Structured references to buckets and objects.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Prefix shared by every S3 bucket and object ARN in the `aws` partition.
const S3_ARN_PREFIX: &str = "arn:aws:s3:::";

/// An Amazon Resource Name for an S3 bucket or object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
pub struct Arn(String);

impl Arn {
    /// ARN of a bucket: `arn:aws:s3:::{bucket}`.
    pub fn bucket(bucket: &str) -> Self {
        Self(format!("{S3_ARN_PREFIX}{bucket}"))
    }

    /// ARN of an object: `arn:aws:s3:::{bucket}/{key}`.
    pub fn object(bucket: &str, key: &str) -> Self {
        Self(format!("{S3_ARN_PREFIX}{bucket}/{key}"))
    }

    /// Returns the ARN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A bucket and key pair identifying one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("s3://{bucket}/{key}")]
pub struct ObjectRef {
    /// Bucket name.
    pub bucket: String,
    /// Decoded object key.
    pub key: String,
}

impl ObjectRef {
    /// Creates a new object reference.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// ARN of the object.
    #[must_use]
    pub fn arn(&self) -> Arn {
        Arn::object(&self.bucket, &self.key)
    }

    /// ARN of the bucket holding the object.
    #[must_use]
    pub fn bucket_arn(&self) -> Arn {
        Arn::bucket(&self.bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_arn() {
        let object = ObjectRef::new("results", "athena-query-results/abc.csv");
        assert_eq!(
            object.arn().as_str(),
            "arn:aws:s3:::results/athena-query-results/abc.csv"
        );
        assert_eq!(object.bucket_arn().as_str(), "arn:aws:s3:::results");
        assert_eq!(
            object.to_string(),
            "s3://results/athena-query-results/abc.csv"
        );
    }

    #[test]
    fn test_bucket_arn() {
        assert_eq!(Arn::bucket("reports").to_string(), "arn:aws:s3:::reports");
    }
}
