//! Object-store client backed by [`object_store::ObjectStore`].
//!
//! [`ObjectStoreClient`] is a thin, cloneable wrapper around
//! `Arc<dyn ObjectStore>` exposing the few operations the pipeline needs.
//! Every method is instrumented with [`tracing`].

use std::sync::Arc;

use bytes::Bytes;
use lockext_core::{Error, ErrorKind, Result};
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};

use crate::TRACING_TARGET;

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object size in bytes.
    pub size: u64,
    /// Entity tag identifying the object content, if the store reports one.
    pub e_tag: Option<String>,
}

/// Leading bytes of an object together with its total size.
#[derive(Debug, Clone)]
pub struct ObjectPrefix {
    /// Bytes read from offset zero.
    pub bytes: Bytes,
    /// Full object size in bytes.
    pub size: u64,
}

impl ObjectPrefix {
    /// Returns `true` if the object extends past the bytes read.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        (self.bytes.len() as u64) < self.size
    }
}

/// Cloneable handle to any [`ObjectStore`] backend.
#[derive(Clone, Debug)]
pub struct ObjectStoreClient(pub Arc<dyn ObjectStore>);

impl ObjectStoreClient {
    /// Wrap a concrete [`ObjectStore`] implementation.
    pub fn new(store: impl ObjectStore) -> Self {
        Self(Arc::new(store))
    }

    /// Verify that the backing store is reachable.
    ///
    /// A HEAD for a probe key answering "not found" still proves the bucket
    /// exists and the credentials work.
    #[tracing::instrument(name = "object.verify", skip(self), target = TRACING_TARGET)]
    pub async fn verify_reachable(&self) -> Result<()> {
        let path = Path::from("_lockext_verify_probe");
        match self.0.head(&path).await {
            Ok(_) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(from_object_store(err, "_lockext_verify_probe")),
        }
    }

    /// Looks up size and entity tag without downloading the body.
    #[tracing::instrument(name = "object.head", skip(self), target = TRACING_TARGET)]
    pub async fn head(&self, key: &str) -> Result<ObjectInfo> {
        let path = Path::from(key);
        let meta = self
            .0
            .head(&path)
            .await
            .map_err(|err| from_object_store(err, key))?;

        Ok(ObjectInfo {
            size: meta.size,
            e_tag: meta.e_tag,
        })
    }

    /// Reads at most `limit` bytes from the start of the object at `key`.
    ///
    /// Issues a metadata lookup first so that empty and short objects never
    /// produce an unsatisfiable range request.
    #[tracing::instrument(name = "object.read_prefix", skip(self), target = TRACING_TARGET)]
    pub async fn read_prefix(&self, key: &str, limit: u64) -> Result<ObjectPrefix> {
        let info = self.head(key).await?;
        let end = info.size.min(limit);
        if end == 0 {
            return Ok(ObjectPrefix {
                bytes: Bytes::new(),
                size: info.size,
            });
        }

        let path = Path::from(key);
        let bytes = self
            .0
            .get_range(&path, 0..end)
            .await
            .map_err(|err| from_object_store(err, key))?;

        tracing::debug!(
            target: TRACING_TARGET,
            key,
            size = info.size,
            read = bytes.len(),
            "Read object prefix"
        );

        Ok(ObjectPrefix {
            bytes,
            size: info.size,
        })
    }

    /// Uploads `data` to `key`, overwriting any existing object.
    #[tracing::instrument(name = "object.put", skip(self, data), fields(size = data.len()), target = TRACING_TARGET)]
    pub async fn put(&self, key: &str, data: Bytes) -> Result<ObjectInfo> {
        let path = Path::from(key);
        let size = data.len() as u64;
        let result = self
            .0
            .put(&path, PutPayload::from(data))
            .await
            .map_err(|err| from_object_store(err, key))?;

        Ok(ObjectInfo {
            size,
            e_tag: result.e_tag,
        })
    }
}

/// Classifies an [`object_store::Error`]; anything not clearly permanent
/// is treated as a transient service failure.
fn from_object_store(err: object_store::Error, key: &str) -> Error {
    let kind = match &err {
        object_store::Error::NotFound { .. } => ErrorKind::NotFound,
        object_store::Error::PermissionDenied { .. } => ErrorKind::Authorization,
        object_store::Error::Unauthenticated { .. } => ErrorKind::Authentication,
        object_store::Error::AlreadyExists { .. }
        | object_store::Error::Precondition { .. }
        | object_store::Error::InvalidPath { .. } => ErrorKind::InvalidInput,
        object_store::Error::NotSupported { .. }
        | object_store::Error::NotImplemented
        | object_store::Error::UnknownConfigurationKey { .. } => ErrorKind::Configuration,
        _ => ErrorKind::ServiceUnavailable,
    };

    Error::from_source(kind, err)
        .with_message("Object store request failed")
        .with_context(key.to_owned())
}
