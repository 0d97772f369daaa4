//! Shared pipeline state.

use std::sync::Arc;

use lockext_batch::BatchJobService;
use lockext_core::{ManifestSources, Result};
use lockext_object::ObjectStoreProvider;
use lockext_query::QueryService;

use super::{Clock, PipelineConfig};

/// Service handles and settings shared by both stages.
///
/// Clones are cheap; every field is reference counted.
#[derive(Clone)]
pub struct PipelineState {
    /// Validated pipeline settings.
    pub config: Arc<PipelineConfig>,
    /// Catalog query engine.
    pub query: QueryService,
    /// Bulk job engine.
    pub batch: BatchJobService,
    /// Object storage, resolved per bucket.
    pub objects: Arc<dyn ObjectStoreProvider>,
    /// Manifest origin table.
    pub sources: Arc<ManifestSources>,
    /// Source of "now".
    pub clock: Clock,
}

impl std::fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineState")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl PipelineState {
    /// Validates `config` and assembles the state with the default
    /// manifest sources and the system clock.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid setting.
    pub fn new(
        config: PipelineConfig,
        query: QueryService,
        batch: BatchJobService,
        objects: impl ObjectStoreProvider + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            query,
            batch,
            objects: Arc::new(objects),
            sources: Arc::new(ManifestSources::default()),
            clock: Clock::System,
        })
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the manifest source table.
    #[must_use]
    pub fn with_sources(mut self, sources: ManifestSources) -> Self {
        self.sources = Arc::new(sources);
        self
    }
}
