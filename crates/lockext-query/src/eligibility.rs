//! The eligibility query.
//!
//! Selects every distinct object of one inventory partition that either has
//! no compliance lock or whose lock expires on or before the cutoff date.

use derive_builder::Builder;
use jiff::civil::Date;
use lockext_core::{Error, IdempotencyToken, Partition, Result};
use serde::{Deserialize, Serialize};

use crate::QueryRequest;

/// Column alias for object keys in the result set.
pub const DEFAULT_KEY_ALIAS: &str = "my_key";

/// Query over the inventory table selecting objects due for extension.
///
/// The bucket column is aliased to the target bucket name. The result
/// header row therefore reads `"{target_bucket}","my_key"` and addresses a
/// harmless single object in the target bucket when the bulk job treats it
/// as data.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(
    name = "EligibilityQueryBuilder",
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(private, name = "build_inner", validate = "Self::validate")
)]
pub struct EligibilityQuery {
    /// Catalog database holding the inventory table.
    pub database: String,
    /// Inventory table name.
    pub table: String,
    /// Bucket whose objects are being extended.
    pub target_bucket: String,
    /// Inventory partition the query is restricted to.
    pub partition: Partition,
    /// Objects locked until this date or earlier are selected.
    pub cutoff: Date,
    /// Alias of the key column.
    #[builder(default = "DEFAULT_KEY_ALIAS.to_owned()")]
    pub key_alias: String,
}

impl EligibilityQueryBuilder {
    /// Builds the query, validating every identifier that ends up in the text.
    pub fn build(self) -> Result<EligibilityQuery> {
        self.build_inner()
            .map_err(|err| Error::invalid_input(err.to_string()))
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(database) = &self.database
            && !is_identifier(database)
        {
            return Err(format!("invalid database name '{database}'"));
        }

        if let Some(table) = &self.table
            && !is_identifier(table)
        {
            return Err(format!("invalid table name '{table}'"));
        }

        if let Some(bucket) = &self.target_bucket
            && !is_bucket_name(bucket)
        {
            return Err(format!("invalid bucket name '{bucket}'"));
        }

        if let Some(partition) = &self.partition
            && !is_column(&partition.column)
        {
            return Err(format!("invalid partition column '{}'", partition.column));
        }

        if let Some(alias) = &self.key_alias
            && !is_column(alias)
        {
            return Err(format!("invalid key alias '{alias}'"));
        }

        Ok(())
    }
}

impl EligibilityQuery {
    /// Creates a builder for this query.
    pub fn builder() -> EligibilityQueryBuilder {
        EligibilityQueryBuilder::default()
    }

    /// Renders the query text.
    #[must_use]
    pub fn to_sql(&self) -> String {
        format!(
            "SELECT DISTINCT bucket AS \"{bucket}\", key AS \"{alias}\"\n\
             FROM \"{database}\".\"{table}\"\n\
             WHERE {column} = '{value}'\n\
             AND (object_lock_retain_until_date <= CAST('{cutoff}' AS timestamp) \
             OR object_lock_mode IS NULL \
             OR object_lock_mode != 'COMPLIANCE')",
            bucket = self.target_bucket,
            alias = self.key_alias,
            database = self.database,
            table = self.table,
            column = self.partition.column,
            value = self.partition.value.replace('\'', "''"),
            cutoff = self.cutoff,
        )
    }

    /// Wraps the rendered query into a submission request.
    pub fn into_request(
        self,
        workgroup: impl Into<String>,
        token: IdempotencyToken,
    ) -> QueryRequest {
        QueryRequest::new(self.to_sql(), self.database, workgroup, token)
    }
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_column(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_bucket_name(value: &str) -> bool {
    (3..=63).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}
