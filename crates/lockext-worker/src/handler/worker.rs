//! JetStream-driven stage workers.

use std::sync::Arc;
use std::time::Duration;

use lockext_nats::{ConsumerConfig, EventMessage, NatsClient, StorageEventStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Disposition, ManifestStage, QueryStage, Stage};
use crate::error::{Result, WorkerError};
use crate::service::{PipelineState, WorkerConfig};

/// Tracing target for stage workers.
const TRACING_TARGET: &str = "lockext_worker::handler";

/// Background worker feeding one stage from a durable consumer.
///
/// Messages are handled concurrently up to the semaphore limit. Each one is
/// settled only after its stage has finished with it, so a crash before
/// settlement leads to redelivery.
pub struct StageWorker {
    stage: Stage,
    nats: NatsClient,
    consumer: ConsumerConfig,
    retry_delay: Duration,
    max_concurrent: usize,
    cancel_token: CancellationToken,
    semaphore: Arc<Semaphore>,
}

impl StageWorker {
    /// Creates a new stage worker.
    ///
    /// # Arguments
    ///
    /// * `stage` - Stage that handles each notification
    /// * `nats` - Connected NATS client
    /// * `consumer` - Durable consumer the worker pulls from
    /// * `retry_delay` - Redelivery delay for [`Disposition::Retry`]
    /// * `max_concurrent` - Messages handled at once
    /// * `cancel_token` - Token for graceful shutdown signaling
    pub fn new(
        stage: Stage,
        nats: NatsClient,
        consumer: ConsumerConfig,
        retry_delay: Duration,
        max_concurrent: usize,
        cancel_token: CancellationToken,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            stage,
            nats,
            consumer,
            retry_delay,
            max_concurrent,
            cancel_token,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Spawns the worker as a background task.
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs the worker loop until cancelled or the stream closes.
    #[tracing::instrument(
        skip(self),
        fields(stage = self.stage.name(), consumer = %self.consumer.durable_name),
        target = TRACING_TARGET,
        name = "stage_worker"
    )]
    async fn run(self) -> Result<()> {
        tracing::info!(target: TRACING_TARGET, "Starting stage worker");

        let subscriber = self
            .nats
            .event_subscriber::<StorageEventStream>(self.consumer.clone())
            .await?;
        let mut messages = subscriber.messages().await?;

        tracing::info!(
            target: TRACING_TARGET,
            stream = subscriber.stream_name(),
            filter_subject = %self.consumer.filter_subject,
            "Subscribed to storage events"
        );

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        "Shutdown requested, stopping stage worker"
                    );
                    break;
                }

                result = messages.next() => {
                    let msg = match result {
                        Ok(Some(msg)) => msg,
                        Ok(None) => {
                            tracing::warn!(target: TRACING_TARGET, "Message stream closed");
                            break;
                        }
                        Err(err) => {
                            tracing::error!(
                                target: TRACING_TARGET,
                                error = %err,
                                "Failed to receive message"
                            );
                            continue;
                        }
                    };

                    let permit = match self.semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::error!(
                                target: TRACING_TARGET,
                                "Semaphore closed, stopping worker"
                            );
                            break;
                        }
                    };

                    let stage = self.stage.clone();
                    let retry_delay = self.retry_delay;

                    tokio::spawn(async move {
                        let _permit = permit;
                        process_message(&stage, msg, retry_delay).await;
                    });
                }
            }
        }

        // Let in-flight messages settle before returning.
        let permits = u32::try_from(self.max_concurrent).unwrap_or(u32::MAX);
        if self.semaphore.acquire_many(permits).await.is_err() {
            tracing::warn!(target: TRACING_TARGET, "Semaphore closed during shutdown");
        }

        tracing::info!(target: TRACING_TARGET, "Stage worker stopped");
        Ok(())
    }
}

/// Handles one message and settles it.
#[tracing::instrument(
    skip(stage, msg, retry_delay),
    fields(stage = stage.name(), subject = %msg.subject(), delivered = ?msg.delivered()),
    target = TRACING_TARGET
)]
async fn process_message(stage: &Stage, msg: EventMessage, retry_delay: Duration) {
    let disposition = stage.handle_payload(msg.payload()).await;

    let settled = match disposition {
        Disposition::Ack => msg.ack().await,
        Disposition::Retry => msg.retry(retry_delay).await,
        Disposition::Reject => msg.term().await,
    };

    match settled {
        Ok(()) => {
            tracing::debug!(
                target: TRACING_TARGET,
                disposition = ?disposition,
                "Message settled"
            );
        }
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET,
                disposition = ?disposition,
                error = %err,
                "Failed to settle message"
            );
        }
    }
}

/// Join handles of both stage workers.
#[derive(Debug)]
pub struct WorkerHandles {
    query: JoinHandle<Result<()>>,
    manifest: JoinHandle<Result<()>>,
}

impl WorkerHandles {
    /// Spawns the query and manifest stage workers.
    pub fn spawn(
        state: &PipelineState,
        config: &WorkerConfig,
        nats: NatsClient,
        cancel_token: CancellationToken,
    ) -> Self {
        let query = StageWorker::new(
            Stage::Query(QueryStage::from_state(state)),
            nats.clone(),
            config.query_consumer_config(),
            config.retry_delay(),
            config.max_concurrent_messages,
            cancel_token.clone(),
        )
        .spawn();

        let manifest = StageWorker::new(
            Stage::Manifest(ManifestStage::from_state(state)),
            nats,
            config.manifest_consumer_config(),
            config.retry_delay(),
            config.max_concurrent_messages,
            cancel_token,
        )
        .spawn();

        Self { query, manifest }
    }

    /// Waits for both workers, returning the first failure.
    pub async fn join(self) -> Result<()> {
        let (query, manifest) = tokio::join!(self.query, self.manifest);
        for (name, joined) in [(QueryStage::NAME, query), (ManifestStage::NAME, manifest)] {
            match joined {
                Ok(result) => result?,
                Err(err) => {
                    return Err(WorkerError::processing_with_source(
                        format!("{name} worker task failed"),
                        err,
                    ));
                }
            }
        }
        Ok(())
    }
}
