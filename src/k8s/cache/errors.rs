/**
 * Helper functions for creating common error types
 */
use crate::error::Error;
use kube::error::ErrorResponse;

/// Wrap an `ErrorResponse` delivered in-band by a watch stream
#[must_use]
pub fn watch_stream_error(response: ErrorResponse) -> Error {
    Error::Kube(kube::Error::Api(response))
}

/// Create an `Expired` error for a watch whose resource version is too old (HTTP 410)
#[must_use]
pub fn watch_expired_error(message: &str) -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: "Expired".to_string(),
        code: 410,
    }))
}

/// Returns true when the error means the watch must be re-listed from scratch
#[must_use]
pub fn is_watch_expired(error: &Error) -> bool {
    matches!(error, Error::Kube(kube::Error::Api(resp)) if resp.code == 410)
}
