//! Reachability reports for the query engine, the job engine and NATS.

use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// How a dependency answered its probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Answered normally.
    Healthy,
    /// Answered, but refused or limited the probe (e.g. missing permission).
    Degraded,
    /// Did not answer.
    Unhealthy,
}

/// Outcome of one dependency probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    /// Probe outcome.
    pub status: ServiceStatus,
    /// Round trip of the probe, when it was measured.
    pub response: Option<Duration>,
    /// Why the dependency is not healthy.
    pub message: Option<String>,
    /// When the report was produced.
    pub checked_at: Timestamp,
}

impl ServiceHealth {
    fn report(status: ServiceStatus, message: Option<String>) -> Self {
        Self {
            status,
            response: None,
            message,
            checked_at: Timestamp::now(),
        }
    }

    /// The dependency answered normally.
    pub fn healthy() -> Self {
        Self::report(ServiceStatus::Healthy, None)
    }

    /// The dependency answered but limited the probe.
    pub fn degraded(message: impl Into<String>) -> Self {
        Self::report(ServiceStatus::Degraded, Some(message.into()))
    }

    /// The dependency could not be reached.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::report(ServiceStatus::Unhealthy, Some(message.into()))
    }

    /// Records the probe round trip.
    #[must_use]
    pub fn with_response_time(mut self, elapsed: Duration) -> Self {
        self.response = Some(elapsed);
        self
    }

    /// Whether the pipeline can still submit work to the dependency.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.status, ServiceStatus::Unhealthy)
    }
}
