//! Long-running stage workers.

use anyhow::Context;
use lockext_nats::NatsClient;
use lockext_worker::{PipelineState, WorkerConfig, WorkerHandles};
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix;
use tokio_util::sync::CancellationToken;

use crate::{TRACING_TARGET_SHUTDOWN, TRACING_TARGET_STARTUP};

/// Connects to NATS and runs both stage workers until a shutdown signal.
pub async fn serve(state: PipelineState, config: &WorkerConfig) -> anyhow::Result<()> {
    let nats = NatsClient::connect(config.nats.clone())
        .await
        .context("failed to connect to NATS")?;

    let cancel_token = CancellationToken::new();
    let handles = WorkerHandles::spawn(&state, config, nats, cancel_token.clone());

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        query_subject = %config.query_subject,
        manifest_subject = %config.manifest_subject,
        max_concurrent_messages = config.max_concurrent_messages,
        "Stage workers started"
    );

    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    handles.join().await.context("stage worker failed")
}

/// Waits for SIGTERM or Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(
                target: TRACING_TARGET_SHUTDOWN,
                error = %e,
                "Failed to install Ctrl+C handler"
            );
            std::future::pending::<()>().await;
        } else {
            tracing::info!(
                target: TRACING_TARGET_SHUTDOWN,
                "Received Ctrl+C signal, draining in-flight messages"
            );
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!(
                    target: TRACING_TARGET_SHUTDOWN,
                    "Received SIGTERM signal, draining in-flight messages"
                );
            }
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET_SHUTDOWN,
                    error = %e,
                    "Failed to install SIGTERM handler"
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
