//! In-memory object stores keyed by bucket name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use lockext_core::Result;
use lockext_object::{ObjectInfo, ObjectStoreClient, ObjectStoreProvider};
use object_store::ObjectStore;
use object_store::memory::InMemory;

use super::lock;

/// Bucket name to in-memory store map.
///
/// Buckets are created on first use. Clones share the same buckets.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStores {
    buckets: Arc<Mutex<HashMap<String, Arc<InMemory>>>>,
}

impl InMemoryStores {
    /// Creates an empty set of buckets.
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, name: &str) -> Arc<InMemory> {
        lock(&self.buckets)
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(InMemory::new()))
            .clone()
    }

    /// Stores an object and returns its metadata.
    pub async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
    ) -> Result<ObjectInfo> {
        let client = ObjectStoreClient(self.bucket(bucket));
        client.put(key, data.into()).await
    }
}

impl ObjectStoreProvider for InMemoryStores {
    fn client(&self, bucket: &str) -> Result<ObjectStoreClient> {
        let store: Arc<dyn ObjectStore> = self.bucket(bucket);
        Ok(ObjectStoreClient(store))
    }
}

#[cfg(test)]
mod tests {
    use lockext_core::ErrorKind;

    use super::*;

    #[tokio::test]
    async fn test_buckets_are_isolated() {
        let stores = InMemoryStores::new();
        stores.put("results", "a.csv", "x\n").await.unwrap();

        let results = stores.client("results").unwrap();
        assert_eq!(results.head("a.csv").await.unwrap().size, 2);

        let other = stores.client("other").unwrap();
        let error = other.head("a.csv").await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotFound);
    }
}
