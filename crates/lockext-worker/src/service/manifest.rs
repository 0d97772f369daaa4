//! Bounded manifest inspection.
//!
//! Only the leading `probe_bytes` of a manifest are read, so the line count
//! is exact for small results and a lower bound for large ones. The count
//! answers one question: is there at least one row after the header?

use std::sync::Arc;

use lockext_core::{ObjectRef, Result};
use lockext_object::ObjectStoreProvider;

use super::PipelineState;

const TRACING_TARGET: &str = "lockext_worker::manifest";

/// Lines found in the probed prefix of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestCount {
    /// Lines in the bytes read, header included.
    pub lines_read: usize,
    /// Number of bytes read.
    pub bytes_read: u64,
    /// Full manifest size.
    pub size: u64,
}

impl ManifestCount {
    /// Whether the manifest has a row beyond the header.
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        self.lines_read > 1
    }

    /// Whether the manifest extends past the probed prefix.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.bytes_read < self.size
    }
}

/// Counts lines the way a line reader would: a final line without a
/// terminator still counts, an empty buffer has none.
#[must_use]
pub fn count_lines(bytes: &[u8]) -> usize {
    let terminated = bytes.iter().filter(|&&byte| byte == b'\n').count();
    match bytes.last() {
        Some(b'\n') | None => terminated,
        Some(_) => terminated + 1,
    }
}

/// Reads the start of a manifest and counts its lines.
#[derive(Clone)]
pub struct ManifestValidator {
    objects: Arc<dyn ObjectStoreProvider>,
    probe_bytes: u64,
}

impl std::fmt::Debug for ManifestValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestValidator")
            .field("probe_bytes", &self.probe_bytes)
            .finish_non_exhaustive()
    }
}

impl ManifestValidator {
    /// Creates a validator reading at most `probe_bytes` per manifest.
    pub fn new(objects: Arc<dyn ObjectStoreProvider>, probe_bytes: u64) -> Self {
        Self {
            objects,
            probe_bytes,
        }
    }

    /// Creates a validator sharing the pipeline state.
    pub fn from_state(state: &PipelineState) -> Self {
        Self::new(state.objects.clone(), state.config.manifest_probe_bytes)
    }

    /// Counts the lines in the leading bytes of `manifest`.
    ///
    /// # Errors
    ///
    /// Any read failure is returned as is; the caller must not act on the
    /// manifest without a count.
    #[tracing::instrument(skip(self), fields(manifest = %manifest), target = TRACING_TARGET)]
    pub async fn count_eligible_rows(&self, manifest: &ObjectRef) -> Result<ManifestCount> {
        let client = self.objects.client(&manifest.bucket)?;
        let prefix = client.read_prefix(&manifest.key, self.probe_bytes).await?;

        let count = ManifestCount {
            lines_read: count_lines(&prefix.bytes),
            bytes_read: prefix.bytes.len() as u64,
            size: prefix.size,
        };

        tracing::info!(
            target: TRACING_TARGET,
            lines_read = count.lines_read,
            bytes_read = count.bytes_read,
            size = count.size,
            truncated = count.is_truncated(),
            "Manifest inspected"
        );

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use lockext_core::ErrorKind;
    use lockext_test::InMemoryStores;

    use super::*;

    const HEADER: &str = "\"locked-data\",\"my_key\"\n";

    #[test]
    fn test_counts_lines_like_a_line_reader() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"header\n"), 1);
        assert_eq!(count_lines(b"header"), 1);
        assert_eq!(count_lines(b"header\nrow"), 2);
        assert_eq!(count_lines(b"header\nrow\n"), 2);
        assert_eq!(count_lines(b"\n\n"), 2);
    }

    fn validator(stores: &InMemoryStores, probe_bytes: u64) -> ManifestValidator {
        ManifestValidator::new(Arc::new(stores.clone()), probe_bytes)
    }

    #[tokio::test]
    async fn test_header_only_is_not_actionable() {
        let stores = InMemoryStores::new();
        stores.put("results", "q.csv", HEADER).await.unwrap();

        let count = validator(&stores, 10_241)
            .count_eligible_rows(&ObjectRef::new("results", "q.csv"))
            .await
            .unwrap();

        assert_eq!(count.lines_read, 1);
        assert!(!count.is_actionable());
        assert!(!count.is_truncated());
    }

    #[tokio::test]
    async fn test_rows_after_header_are_actionable() {
        let stores = InMemoryStores::new();
        let body = format!("{HEADER}\"locked-data\",\"a\"\n\"locked-data\",\"b\"\n\"locked-data\",\"c\"\n");
        stores.put("results", "q.csv", body).await.unwrap();

        let count = validator(&stores, 10_241)
            .count_eligible_rows(&ObjectRef::new("results", "q.csv"))
            .await
            .unwrap();

        assert_eq!(count.lines_read, 4);
        assert!(count.is_actionable());
    }

    #[tokio::test]
    async fn test_reads_only_the_probe() {
        let stores = InMemoryStores::new();
        let row = "\"locked-data\",\"some/long/object/key.bin\"\n";
        let body = format!("{HEADER}{}", row.repeat(1_000));
        stores.put("results", "q.csv", body.clone()).await.unwrap();

        let count = validator(&stores, 1024)
            .count_eligible_rows(&ObjectRef::new("results", "q.csv"))
            .await
            .unwrap();

        assert_eq!(count.bytes_read, 1024);
        assert_eq!(count.size, body.len() as u64);
        assert!(count.is_truncated());
        assert!(count.is_actionable());
        assert!(count.lines_read < 1_001);
    }

    #[tokio::test]
    async fn test_empty_manifest_is_not_actionable() {
        let stores = InMemoryStores::new();
        stores.put("results", "q.csv", "").await.unwrap();

        let count = validator(&stores, 10_241)
            .count_eligible_rows(&ObjectRef::new("results", "q.csv"))
            .await
            .unwrap();
        assert_eq!(count.lines_read, 0);
        assert!(!count.is_actionable());
    }

    #[tokio::test]
    async fn test_missing_manifest_is_an_error() {
        let stores = InMemoryStores::new();
        let error = validator(&stores, 10_241)
            .count_eligible_rows(&ObjectRef::new("results", "missing.csv"))
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotFound);
    }
}
