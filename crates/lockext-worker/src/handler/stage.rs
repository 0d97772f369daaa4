//! Stage entry points and their failure policy.

use lockext_core::{IdempotencyToken, StorageEventRecord, StorageNotification, TriggerEvent};

use crate::service::{
    BulkRetentionJobSubmitter, EligibilityQuerySubmitter, ManifestValidator, PipelineState,
};

const TRACING_TARGET: &str = "lockext_worker::stage";

/// What to do with a delivered notification once a stage has handled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Done; do not redeliver.
    Ack,
    /// The invocation failed; redeliver later.
    Retry,
    /// The payload can never be handled; drop it.
    Reject,
}

impl Disposition {
    /// Combines the outcomes of two records of one notification.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Reject, _) | (_, Self::Reject) => Self::Reject,
            (Self::Retry, _) | (_, Self::Retry) => Self::Retry,
            (Self::Ack, Self::Ack) => Self::Ack,
        }
    }
}

/// Skips anything that is not an object creation event.
fn trigger_event(stage: &'static str, record: &StorageEventRecord) -> Option<TriggerEvent> {
    if !record.is_object_created() {
        tracing::warn!(
            target: TRACING_TARGET,
            stage,
            event_name = %record.event_name,
            key = %record.s3.object.key,
            "Ignoring non-creation event"
        );
        return None;
    }

    match TriggerEvent::from_record(record) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET,
                stage,
                bucket = %record.s3.bucket.name,
                key = %record.s3.object.key,
                error = %err,
                "Malformed event record"
            );
            None
        }
    }
}

/// Best-effort stage: starts the eligibility query and acknowledges
/// regardless of the outcome.
#[derive(Debug, Clone)]
pub struct QueryStage {
    submitter: EligibilityQuerySubmitter,
}

impl QueryStage {
    /// Stage name used in logs.
    pub const NAME: &'static str = "query";

    /// Creates the stage around a submitter.
    pub fn new(submitter: EligibilityQuerySubmitter) -> Self {
        Self { submitter }
    }

    /// Creates the stage from pipeline state.
    pub fn from_state(state: &PipelineState) -> Self {
        Self::new(EligibilityQuerySubmitter::from_state(state))
    }

    /// Handles every record of a notification.
    pub async fn handle_notification(&self, notification: &StorageNotification) -> Disposition {
        let mut disposition = Disposition::Ack;
        for record in &notification.records {
            disposition = disposition.merge(self.handle_record(record).await);
        }
        disposition
    }

    /// Handles one record. Always [`Disposition::Ack`]: a failed submission
    /// is logged and a redelivery would resubmit with the same token anyway.
    pub async fn handle_record(&self, record: &StorageEventRecord) -> Disposition {
        let Some(event) = trigger_event(Self::NAME, record) else {
            return Disposition::Ack;
        };

        if let Err(err) = self.submitter.submit_eligibility_query(&event).await {
            tracing::error!(
                target: TRACING_TARGET,
                stage = Self::NAME,
                bucket = %event.object.bucket,
                key = %event.object.key,
                sequencer = %event.sequencer,
                error = %err,
                retryable = err.is_retryable(),
                "Eligibility query was not submitted"
            );
        }

        Disposition::Ack
    }
}

/// Propagating stage: validates a manifest and submits the retention job,
/// asking for redelivery when the outcome could change on a later attempt.
#[derive(Debug, Clone)]
pub struct ManifestStage {
    validator: ManifestValidator,
    submitter: BulkRetentionJobSubmitter,
}

impl ManifestStage {
    /// Stage name used in logs.
    pub const NAME: &'static str = "manifest";

    /// Creates the stage around its components.
    pub fn new(validator: ManifestValidator, submitter: BulkRetentionJobSubmitter) -> Self {
        Self {
            validator,
            submitter,
        }
    }

    /// Creates the stage from pipeline state.
    pub fn from_state(state: &PipelineState) -> Self {
        Self::new(
            ManifestValidator::from_state(state),
            BulkRetentionJobSubmitter::from_state(state),
        )
    }

    /// Handles every record of a notification.
    pub async fn handle_notification(&self, notification: &StorageNotification) -> Disposition {
        let mut disposition = Disposition::Ack;
        for record in &notification.records {
            disposition = disposition.merge(self.handle_record(record).await);
        }
        disposition
    }

    /// Handles one record.
    pub async fn handle_record(&self, record: &StorageEventRecord) -> Disposition {
        let Some(event) = trigger_event(Self::NAME, record) else {
            return Disposition::Ack;
        };

        let count = match self.validator.count_eligible_rows(&event.object).await {
            Ok(count) => count,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    stage = Self::NAME,
                    manifest = %event.object,
                    sequencer = %event.sequencer,
                    error = %err,
                    "Manifest could not be read"
                );
                return Disposition::Retry;
            }
        };

        if !count.is_actionable() {
            tracing::info!(
                target: TRACING_TARGET,
                stage = Self::NAME,
                manifest = %event.object,
                lines_read = count.lines_read,
                "No action required, query returned no rows"
            );
            return Disposition::Ack;
        }

        let token = match IdempotencyToken::for_batch_job(&event.sequencer) {
            Ok(token) => token,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    stage = Self::NAME,
                    manifest = %event.object,
                    error = %err,
                    "Job token could not be derived"
                );
                return Disposition::Ack;
            }
        };

        match self.submitter.submit_retention_job(&event, token).await {
            Ok(_) => Disposition::Ack,
            Err(err) if err.is_retryable() => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    stage = Self::NAME,
                    manifest = %event.object,
                    sequencer = %event.sequencer,
                    error = %err,
                    "Retention job submission failed, requesting redelivery"
                );
                Disposition::Retry
            }
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    stage = Self::NAME,
                    manifest = %event.object,
                    sequencer = %event.sequencer,
                    error = %err,
                    "Retention job was not submitted"
                );
                Disposition::Ack
            }
        }
    }
}

/// One of the two pipeline stages.
#[derive(Debug, Clone)]
pub enum Stage {
    /// Eligibility query submission.
    Query(QueryStage),
    /// Manifest validation and job submission.
    Manifest(ManifestStage),
}

impl Stage {
    /// Stage name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Query(_) => QueryStage::NAME,
            Self::Manifest(_) => ManifestStage::NAME,
        }
    }

    /// Parses a raw notification and hands it to the stage.
    ///
    /// A payload that is not a notification document is rejected.
    pub async fn handle_payload(&self, payload: &[u8]) -> Disposition {
        let notification = match StorageNotification::from_slice(payload) {
            Ok(notification) => notification,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    stage = self.name(),
                    payload_len = payload.len(),
                    error = %err,
                    "Rejecting unparseable notification"
                );
                return Disposition::Reject;
            }
        };

        if notification.records.is_empty() {
            tracing::info!(
                target: TRACING_TARGET,
                stage = self.name(),
                "Notification has no records"
            );
            return Disposition::Ack;
        }

        match self {
            Self::Query(stage) => stage.handle_notification(&notification).await,
            Self::Manifest(stage) => stage.handle_notification(&notification).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_retry_over_ack() {
        use Disposition::*;
        assert_eq!(Ack.merge(Ack), Ack);
        assert_eq!(Ack.merge(Retry), Retry);
        assert_eq!(Retry.merge(Ack), Retry);
        assert_eq!(Retry.merge(Reject), Reject);
    }
}
