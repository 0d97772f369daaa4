//! Worker error types.

use std::borrow::Cow;

/// Result type alias for worker operations.
pub type Result<T, E = WorkerError> = std::result::Result<T, E>;

/// Worker error type.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Failed to subscribe to the event stream.
    #[error("subscription failed: {0}")]
    Subscription(#[from] lockext_nats::Error),

    /// Pipeline configuration or wiring is invalid.
    #[error("pipeline setup failed: {0}")]
    Setup(#[from] lockext_core::Error),

    /// A worker task stopped abnormally.
    #[error("worker failed: {message}")]
    Processing {
        message: Cow<'static, str>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl WorkerError {
    /// Creates a processing error with a message and source.
    pub fn processing_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
