//! Gateway error types and failure classification.

use std::error::Error as StdError;
use std::io;

use ratesync_common::SyncErrorKind;
use thiserror::Error;

/// Maximum length for error response bodies kept in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors returned by a [`RemoteGateway`](crate::RemoteGateway).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No route to the service (DNS failure, network down).
    #[error("No connectivity: {0}")]
    Offline(String),

    /// The request did not finish in time.
    #[error("Request timed out")]
    Timeout,

    /// The host refused or dropped the connection.
    #[error("Host unreachable: {0}")]
    Unreachable(String),

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Any other transport failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Build an error from a non-success response.
    pub fn from_status(status: u16, body: &str) -> Self {
        GatewayError::Status {
            status,
            body: truncate_body(body),
        }
    }

    /// Classify into the user-facing taxonomy.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            GatewayError::Offline(_) => SyncErrorKind::NoConnectivity,
            GatewayError::Timeout => SyncErrorKind::Timeout,
            GatewayError::Unreachable(_) => SyncErrorKind::HostUnreachable,
            GatewayError::Status { status, .. } => status_kind(*status),
            GatewayError::Decode(_) => SyncErrorKind::MalformedResponse,
            GatewayError::Transport(_) => SyncErrorKind::Unknown,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Map a non-success HTTP status to an error kind.
pub fn status_kind(status: u16) -> SyncErrorKind {
    match status {
        408 | 504 => SyncErrorKind::Timeout,
        429 | 500..=599 => SyncErrorKind::HostUnreachable,
        _ => SyncErrorKind::Unknown,
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return GatewayError::Timeout;
        }
        if err.is_decode() {
            return GatewayError::Decode(err.to_string());
        }

        let detail = error_chain(&err);
        match find_io_error(&err) {
            Some(io_err) => from_io_kind(io_err.kind(), detail),
            None if err.is_connect() => GatewayError::Offline(detail),
            None => GatewayError::Transport(detail),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// Classify an I/O failure seen while talking to the service.
pub(crate) fn from_io_kind(kind: io::ErrorKind, detail: String) -> GatewayError {
    match kind {
        io::ErrorKind::TimedOut => GatewayError::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => GatewayError::Unreachable(detail),
        _ => GatewayError::Offline(detail),
    }
}

fn find_io_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a io::Error> {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err);
        }
        source = e.source();
    }
    None
}

/// reqwest's Display hides the cause, so render the whole chain.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        out.push_str(": ");
        out.push_str(&e.to_string());
        source = e.source();
    }
    out
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_kind(408), SyncErrorKind::Timeout);
        assert_eq!(status_kind(504), SyncErrorKind::Timeout);
        assert_eq!(status_kind(429), SyncErrorKind::HostUnreachable);
        assert_eq!(status_kind(500), SyncErrorKind::HostUnreachable);
        assert_eq!(status_kind(502), SyncErrorKind::HostUnreachable);
        assert_eq!(status_kind(503), SyncErrorKind::HostUnreachable);
        assert_eq!(status_kind(404), SyncErrorKind::Unknown);
        assert_eq!(status_kind(401), SyncErrorKind::Unknown);
    }

    #[test]
    fn test_io_kind_mapping() {
        let detail = || "x".to_string();
        assert_eq!(from_io_kind(io::ErrorKind::TimedOut, detail()), GatewayError::Timeout);
        assert_eq!(
            from_io_kind(io::ErrorKind::ConnectionRefused, detail()).kind(),
            SyncErrorKind::HostUnreachable
        );
        assert_eq!(
            from_io_kind(io::ErrorKind::ConnectionReset, detail()).kind(),
            SyncErrorKind::HostUnreachable
        );
        assert_eq!(
            from_io_kind(io::ErrorKind::Other, detail()).kind(),
            SyncErrorKind::NoConnectivity
        );
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "я".repeat(400);
        let err = GatewayError::from_status(500, &body);
        match err {
            GatewayError::Status { body: kept, .. } => {
                assert!(kept.contains("truncated, 800 total bytes"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_error_is_malformed() {
        let err: GatewayError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.kind(), SyncErrorKind::MalformedResponse);
        assert!(!err.is_retryable());
    }
}
