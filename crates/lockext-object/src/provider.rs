//! Per-bucket client resolution.

use lockext_core::Result;

use crate::ObjectStoreClient;

/// Resolves an [`ObjectStoreClient`] bound to a named bucket.
///
/// Manifest events can come from any bucket the query engine writes to,
/// so the stage asks for a client per event instead of holding one.
pub trait ObjectStoreProvider: Send + Sync {
    /// Returns a client for `bucket`.
    fn client(&self, bucket: &str) -> Result<ObjectStoreClient>;
}
