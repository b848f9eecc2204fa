//! Sync failure taxonomy shared by every ratesync component.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::Timestamp;

/// User-facing classification of a failed sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    /// The device has no route to the network.
    NoConnectivity,
    /// The request or the whole fetch ran past its deadline.
    Timeout,
    /// The host answered badly or refused the connection.
    HostUnreachable,
    /// The response body could not be decoded or held no usable rates.
    MalformedResponse,
    /// The local database rejected a read or write.
    StorageFailure,
    /// Anything else.
    Unknown,
}

impl SyncErrorKind {
    /// Check if a later attempt may succeed without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncErrorKind::NoConnectivity | SyncErrorKind::Timeout | SyncErrorKind::HostUnreachable
        )
    }

    /// Get a stable error code for logs and telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncErrorKind::NoConnectivity => "NO_CONNECTIVITY",
            SyncErrorKind::Timeout => "TIMEOUT",
            SyncErrorKind::HostUnreachable => "HOST_UNREACHABLE",
            SyncErrorKind::MalformedResponse => "MALFORMED_RESPONSE",
            SyncErrorKind::StorageFailure => "STORAGE_FAILURE",
            SyncErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Short message suitable for showing next to stale data.
    pub fn user_message(&self) -> &'static str {
        match self {
            SyncErrorKind::NoConnectivity => "No internet connection",
            SyncErrorKind::Timeout => "The server took too long to respond",
            SyncErrorKind::HostUnreachable => "The rates service is unavailable",
            SyncErrorKind::MalformedResponse => "Received unexpected data from the server",
            SyncErrorKind::StorageFailure => "Could not save rates on this device",
            SyncErrorKind::Unknown => "Could not update rates",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.error_code())
    }
}

/// A classified failure as published next to the last good snapshot.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: SyncErrorKind,
    pub message: String,
    pub occurred_at: Timestamp,
}

impl ClassifiedError {
    /// Create a new classified error stamped with the current time.
    pub fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            occurred_at: crate::now(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
