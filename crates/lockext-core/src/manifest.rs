//! Manifest origins and the schema each one uses.
//!
//! A bulk job needs to know how to read its manifest. Rather than inspect
//! the content, the schema is looked up from the manifest's key in a
//! [`ManifestSources`] table.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::{Error, Result};

/// Key fragment identifying eligibility query results.
pub const QUERY_RESULTS_MARKER: &str = "athena-query-results/";

/// Key suffix identifying storage inventory manifests.
pub const INVENTORY_MANIFEST_SUFFIX: &str = "manifest.json";

/// Manifest encodings understood by the bulk job engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
pub enum ManifestFormat {
    /// CSV rows of the listed fields, without a schema header.
    #[strum(serialize = "S3BatchOperations_CSV_20180820")]
    #[serde(rename = "S3BatchOperations_CSV_20180820")]
    BatchOperationsCsv,
    /// Storage inventory report manifest.
    #[strum(serialize = "S3InventoryReport_CSV_20161130")]
    #[serde(rename = "S3InventoryReport_CSV_20161130")]
    InventoryReportCsv,
}

/// Columns of a CSV manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
pub enum ManifestField {
    /// Bucket name.
    Bucket,
    /// Object key.
    Key,
    /// Object version identifier.
    VersionId,
    /// Not read by the job.
    Ignore,
}

/// Format and field list for one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSchema {
    /// Manifest encoding.
    pub format: ManifestFormat,
    /// CSV column layout; empty for self-describing formats.
    pub fields: Vec<ManifestField>,
}

impl ManifestSchema {
    /// Creates a schema.
    pub fn new(format: ManifestFormat, fields: impl Into<Vec<ManifestField>>) -> Self {
        Self {
            format,
            fields: fields.into(),
        }
    }
}

/// How a manifest key is recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMatcher {
    /// The key contains the fragment anywhere.
    Contains(String),
    /// The key ends with the suffix.
    EndsWith(String),
}

impl KeyMatcher {
    fn matches(&self, key: &str) -> bool {
        match self {
            Self::Contains(fragment) => key.contains(fragment.as_str()),
            Self::EndsWith(suffix) => key.ends_with(suffix.as_str()),
        }
    }
}

/// One row of the manifest source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSource {
    /// Short name used in logs.
    pub name: String,
    /// Key pattern identifying manifests of this origin.
    pub matcher: KeyMatcher,
    /// Schema applied to matching manifests.
    pub schema: ManifestSchema,
}

/// Ordered table of manifest sources; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSources {
    sources: Vec<ManifestSource>,
}

impl Default for ManifestSources {
    fn default() -> Self {
        Self {
            sources: vec![
                ManifestSource {
                    name: "eligibility_query".to_owned(),
                    matcher: KeyMatcher::Contains(QUERY_RESULTS_MARKER.to_owned()),
                    schema: ManifestSchema::new(
                        ManifestFormat::BatchOperationsCsv,
                        [ManifestField::Bucket, ManifestField::Key],
                    ),
                },
                ManifestSource {
                    name: "inventory_report".to_owned(),
                    matcher: KeyMatcher::EndsWith(INVENTORY_MANIFEST_SUFFIX.to_owned()),
                    schema: ManifestSchema::new(ManifestFormat::InventoryReportCsv, Vec::new()),
                },
            ],
        }
    }
}

impl ManifestSources {
    /// Creates an empty table.
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Appends a source after the existing ones.
    #[must_use]
    pub fn with_source(mut self, source: ManifestSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Finds the source of a manifest key.
    pub fn resolve(&self, key: &str) -> Result<&ManifestSource> {
        self.sources
            .iter()
            .find(|source| source.matcher.matches(key))
            .ok_or_else(|| {
                Error::invalid_input("Manifest key does not match any known source")
                    .with_context(key.to_owned())
            })
    }

    /// Returns the registered sources in match order.
    pub fn iter(&self) -> impl Iterator<Item = &ManifestSource> {
        self.sources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_query_results_resolve_to_bucket_key_csv() {
        let sources = ManifestSources::default();
        let source = sources
            .resolve("athena-query-results/3f2a9c1e-7d7b.csv")
            .unwrap();

        assert_eq!(source.name, "eligibility_query");
        assert_eq!(source.schema.format, ManifestFormat::BatchOperationsCsv);
        assert_eq!(
            source.schema.fields,
            vec![ManifestField::Bucket, ManifestField::Key]
        );
    }

    #[test]
    fn test_inventory_manifest_resolves() {
        let sources = ManifestSources::default();
        let source = sources
            .resolve("inventory/locked-bucket/daily/2024-06-01T01-00Z/manifest.json")
            .unwrap();
        assert_eq!(source.schema.format, ManifestFormat::InventoryReportCsv);
        assert!(source.schema.fields.is_empty());
    }

    #[test]
    fn test_unknown_manifest_is_rejected() {
        let error = ManifestSources::default()
            .resolve("reports/job-1234/results.csv")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn test_custom_source() {
        let sources = ManifestSources::empty().with_source(ManifestSource {
            name: "versioned".to_owned(),
            matcher: KeyMatcher::Contains("versioned-results/".to_owned()),
            schema: ManifestSchema::new(
                ManifestFormat::BatchOperationsCsv,
                [
                    ManifestField::Bucket,
                    ManifestField::Key,
                    ManifestField::VersionId,
                ],
            ),
        });

        let source = sources.resolve("versioned-results/a.csv").unwrap();
        assert_eq!(source.schema.fields.len(), 3);
        assert!(sources.resolve("athena-query-results/a.csv").is_err());
    }

    #[test]
    fn test_format_wire_names() {
        assert_eq!(
            ManifestFormat::BatchOperationsCsv.as_ref(),
            "S3BatchOperations_CSV_20180820"
        );
        assert_eq!(
            ManifestFormat::InventoryReportCsv.to_string(),
            "S3InventoryReport_CSV_20161130"
        );
        assert_eq!(ManifestField::VersionId.as_ref(), "VersionId");
    }
}
