//! Dependency health probes.

use std::time::Instant;

use anyhow::bail;
use lockext_core::ServiceHealth;
use lockext_nats::NatsClient;
use lockext_worker::{PipelineState, WorkerConfig};

use crate::TRACING_TARGET_COMMAND;

/// Probes the query engine, the job engine, object storage and NATS.
///
/// Fails when any of them is unavailable.
pub async fn health(state: &PipelineState, config: &WorkerConfig) -> anyhow::Result<()> {
    let nats = match NatsClient::connect(config.nats.clone()).await {
        Ok(client) => client.health_check().await,
        Err(err) => ServiceHealth::unhealthy(err.to_string()),
    };

    let checks = [
        ("query", probe(state.query.health_check().await)),
        ("batch", probe(state.batch.health_check().await)),
        ("storage", storage(state).await),
        ("nats", nats),
    ];

    let mut unavailable = Vec::new();
    for (name, health) in &checks {
        tracing::info!(
            target: TRACING_TARGET_COMMAND,
            service = name,
            status = ?health.status,
            response_ms = health.response.map(|d| d.as_millis()),
            message = health.message.as_deref(),
            "Health checked"
        );

        if !health.is_available() {
            unavailable.push(*name);
        }
    }

    if !unavailable.is_empty() {
        bail!("unavailable services: {}", unavailable.join(", "));
    }

    Ok(())
}

/// Checks that the report bucket answers with the configured credentials.
async fn storage(state: &PipelineState) -> ServiceHealth {
    let started_at = Instant::now();
    let result = match state.objects.client(&state.config.report_bucket) {
        Ok(client) => client.verify_reachable().await,
        Err(err) => Err(err),
    };

    let health = match result {
        Ok(()) => ServiceHealth::healthy(),
        Err(err) => ServiceHealth::unhealthy(err.to_string()),
    };
    health.with_response_time(started_at.elapsed())
}

fn probe(result: lockext_core::Result<ServiceHealth>) -> ServiceHealth {
    result.unwrap_or_else(|err| ServiceHealth::unhealthy(err.to_string()))
}
