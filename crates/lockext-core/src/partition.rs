//! Hive-style partition extraction from object keys.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A `column=value` partition segment taken from an object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// Partition column name, e.g. `dt`.
    pub column: String,
    /// Partition value, e.g. `2024-01-15`.
    pub value: String,
}

impl Partition {
    /// Creates a partition from its column and value.
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Extracts the partition from a decoded object key.
    ///
    /// The last `column=value` directory segment before the object name
    /// wins, so `inventory/dt=2024-01-15/part-0000.csv` yields `dt` and
    /// `2024-01-15`.
    pub fn from_key(key: &str) -> Result<Self> {
        let Some((directories, _object_name)) = key.rsplit_once('/') else {
            return Err(Error::invalid_input("Object key has no partition directory")
                .with_context(key.to_owned()));
        };

        let segment = directories
            .rsplit('/')
            .find_map(|segment| segment.split_once('='))
            .ok_or_else(|| {
                Error::invalid_input("Object key has no column=value segment")
                    .with_context(key.to_owned())
            })?;

        match segment {
            (column, value) if is_column_name(column) && !value.is_empty() => {
                Ok(Self::new(column, value))
            }
            (column, _) => Err(Error::invalid_input(format!(
                "Invalid partition segment for column '{column}'"
            ))
            .with_context(key.to_owned())),
        }
    }
}

/// Partition columns end up as bare identifiers in query text.
fn is_column_name(column: &str) -> bool {
    !column.is_empty()
        && column
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
