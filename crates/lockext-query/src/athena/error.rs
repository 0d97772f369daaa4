//! Mapping of Athena SDK failures onto the shared error kinds.

use aws_sdk_athena::config::http::HttpResponse;
use aws_sdk_athena::error::{ProvideErrorMetadata, SdkError};
use lockext_core::{Error, ErrorKind};

/// Converts an SDK failure, keeping the service error code and message.
pub(super) fn from_sdk_error<E>(err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let kind = match &err {
        SdkError::ConstructionFailure(_) => ErrorKind::Configuration,
        SdkError::TimeoutError(_) => ErrorKind::Timeout,
        SdkError::DispatchFailure(_) => ErrorKind::NetworkError,
        SdkError::ServiceError(context) => {
            ErrorKind::from_service_code(context.err().code(), context.raw().status().as_u16())
        }
        _ => ErrorKind::ExternalError,
    };

    let message = match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("Athena {code}: {message}"),
        (Some(code), None) => format!("Athena {code}"),
        _ => "Athena request failed".to_owned(),
    };

    Error::from_source(kind, err).with_message(message)
}
