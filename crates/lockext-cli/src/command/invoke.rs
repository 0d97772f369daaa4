//! One-shot stage invocation.

use std::path::Path;

use anyhow::{Context, bail};
use lockext_worker::{Disposition, ManifestStage, PipelineState, QueryStage, Stage};

use crate::TRACING_TARGET_COMMAND;
use crate::config::StageKind;

/// Runs one stage against the notification document at `event`.
///
/// Fails when the stage asks for redelivery or rejects the document, so the
/// process exit code tells the caller whether to try again.
pub async fn invoke(state: &PipelineState, kind: StageKind, event: &Path) -> anyhow::Result<()> {
    let payload = tokio::fs::read(event)
        .await
        .with_context(|| format!("failed to read event document {}", event.display()))?;

    let stage = match kind {
        StageKind::Query => Stage::Query(QueryStage::from_state(state)),
        StageKind::Manifest => Stage::Manifest(ManifestStage::from_state(state)),
    };

    let disposition = stage.handle_payload(&payload).await;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        stage = stage.name(),
        event = %event.display(),
        disposition = ?disposition,
        "Stage invocation finished"
    );

    match disposition {
        Disposition::Ack => Ok(()),
        Disposition::Retry => bail!("{} stage requested redelivery", stage.name()),
        Disposition::Reject => bail!("{} is not a storage notification", event.display()),
    }
}
