//! Structured error handling shared by every pipeline stage.
//!
//! Each operation returns [`Result`], and the [`ErrorKind`] of a failure is
//! what the stage boundary inspects when deciding between acknowledging an
//! event and asking for redelivery.

use std::borrow::Cow;

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Underlying cause carried by an [`Error`].
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used across the pipeline crates.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur while extending retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed event, key, manifest or request.
    InvalidInput,
    /// Connection reset, DNS failure or similar transport problem.
    NetworkError,
    /// Credentials missing or rejected.
    Authentication,
    /// Credentials valid but lacking permission.
    Authorization,
    /// Throttled by the remote service.
    RateLimited,
    /// Remote service failed on its side.
    ServiceUnavailable,
    /// Bug or broken invariant in this process.
    InternalError,
    /// Remote service answered with something unusable.
    ExternalError,
    /// Invalid startup settings.
    Configuration,
    /// Bucket, object or job does not exist.
    NotFound,
    /// Call exceeded its deadline.
    Timeout,
    /// Payload could not be decoded.
    Serialization,
    /// Not classified.
    #[default]
    Unknown,
}

impl ErrorKind {
    /// Check if this error kind is transient and worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::Timeout | Self::ServiceUnavailable | Self::RateLimited
        )
    }

    /// Classifies an HTTP status code returned by an external service.
    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            400 | 409 | 422 => Self::InvalidInput,
            401 => Self::Authentication,
            403 => Self::Authorization,
            404 => Self::NotFound,
            408 => Self::Timeout,
            429 => Self::RateLimited,
            500..=599 => Self::ServiceUnavailable,
            _ => Self::ExternalError,
        }
    }

    /// Classifies a service error from its error code, falling back to the
    /// HTTP status when the code is missing or unrecognized.
    #[must_use]
    pub fn from_service_code(code: Option<&str>, status: u16) -> Self {
        match code {
            Some(
                "ThrottlingException"
                | "TooManyRequestsException"
                | "SlowDown"
                | "RequestLimitExceeded",
            ) => Self::RateLimited,
            Some("InternalServerException" | "InternalError" | "ServiceUnavailable") => {
                Self::ServiceUnavailable
            }
            Some("AccessDeniedException" | "AccessDenied") => Self::Authorization,
            Some("InvalidRequestException" | "BadRequestException" | "IdempotencyException") => {
                Self::InvalidInput
            }
            Some("NotFoundException" | "NoSuchBucket" | "NoSuchKey") => Self::NotFound,
            _ => Self::from_http_status(status),
        }
    }
}

/// A classified failure with optional message, cause and affected resource.
#[must_use]
#[derive(Debug, Error)]
#[error("[{kind}]{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// Classification driving the retry decision.
    pub kind: ErrorKind,
    /// Human readable description.
    pub message: Option<Cow<'static, str>>,
    /// Cause reported by a dependency.
    #[source]
    pub source: Option<BoxedError>,
    /// Additional context information, usually the resource involved.
    pub context: Option<Cow<'static, str>>,
}

impl Error {
    /// Bare error of `kind`.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            context: None,
        }
    }

    /// Error of `kind` caused by `source`.
    pub fn from_source(kind: ErrorKind, source: impl Into<BoxedError>) -> Self {
        Self {
            kind,
            message: None,
            source: Some(source.into()),
            context: None,
        }
    }

    /// Shorthand for an [`ErrorKind::InvalidInput`] error with a message.
    pub fn invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidInput).with_message(message)
    }

    /// Shorthand for an [`ErrorKind::Configuration`] error with a message.
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Configuration).with_message(message)
    }

    /// Sets the description.
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the cause.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Names the affected resource or setting.
    pub fn with_context(mut self, context: impl Into<Cow<'static, str>>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Whether redelivering the triggering event may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::from_source(ErrorKind::Serialization, error)
            .with_message("Invalid storage event payload")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_error_builder_pattern() {
        let error = Error::new(ErrorKind::Configuration)
            .with_message("missing role arn")
            .with_context("batch_role_arn");

        assert_eq!(error.kind, ErrorKind::Configuration);
        assert_eq!(error.message.as_deref(), Some("missing role arn"));
        assert_eq!(error.context.as_deref(), Some("batch_role_arn"));
        assert!(error.source.is_none());
    }

    #[test]
    fn test_error_display() {
        let error = Error::invalid_input("empty sequencer");
        let display = error.to_string();
        assert!(display.contains("invalid_input"));
        assert!(display.contains("empty sequencer"));

        let bare = Error::new(ErrorKind::Timeout);
        assert_eq!(bare.to_string(), "[timeout]");
    }

    #[test]
    fn test_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = Error::from(json_error);
        assert_eq!(error.kind, ErrorKind::Serialization);
        assert!(error.source.is_some());
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::NetworkError.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::ServiceUnavailable.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());

        assert!(!ErrorKind::InvalidInput.is_retryable());
        assert!(!ErrorKind::Authorization.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(!ErrorKind::Configuration.is_retryable());
        assert!(!Error::new(ErrorKind::Unknown).is_retryable());
    }

    #[test]
    fn test_from_http_status() {
        assert_eq!(ErrorKind::from_http_status(400), ErrorKind::InvalidInput);
        assert_eq!(ErrorKind::from_http_status(403), ErrorKind::Authorization);
        assert_eq!(ErrorKind::from_http_status(404), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_http_status(429), ErrorKind::RateLimited);
        assert_eq!(ErrorKind::from_http_status(503), ErrorKind::ServiceUnavailable);
        assert_eq!(ErrorKind::from_http_status(302), ErrorKind::ExternalError);
    }

    #[test]
    fn test_from_service_code() {
        assert_eq!(
            ErrorKind::from_service_code(Some("TooManyRequestsException"), 400),
            ErrorKind::RateLimited
        );
        assert_eq!(
            ErrorKind::from_service_code(Some("InvalidRequestException"), 400),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            ErrorKind::from_service_code(Some("SomethingNew"), 503),
            ErrorKind::ServiceUnavailable
        );
        assert_eq!(ErrorKind::from_service_code(None, 403), ErrorKind::Authorization);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            ErrorKind::from_str("rate_limited").unwrap(),
            ErrorKind::RateLimited
        );
        assert_eq!(ErrorKind::from_str("not_found").unwrap(), ErrorKind::NotFound);
        assert!(ErrorKind::from_str("throttled").is_err());
    }
}
