//! Connection-level errors and the reason reported with every disconnect.

use crate::port::PortError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A specialized `Result` type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Errors returned directly to callers of the connection API.
///
/// Hardware faults during `run` are not errors of this type; they end the
/// connection and surface as a [`DisconnectReason`].
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Settings rejected at construction.
    #[error("Invalid connection settings: {0}")]
    InvalidSettings(String),

    /// `run` was invoked on a connection that already ran.
    #[error("Connection {0} has already been started")]
    AlreadyStarted(String),

    /// The transport rejected an outbound write.
    #[error("Write failed: {0}")]
    Write(#[source] PortError),

    /// The lifecycle thread could not be created.
    #[error("Failed to spawn connection thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The lifecycle thread panicked.
    #[error("Connection thread for {0} panicked")]
    Panicked(String),
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The device connection could not be acquired; no byte was ever read.
    OpenFailed(String),
    /// The device was acquired but its port could not be claimed or configured.
    ConfigureFailed(String),
    /// The read loop hit an I/O fault.
    ReadFault(String),
    /// Shutdown was requested through the cancellation flag or `disconnect`.
    Cancelled,
    /// Shutdown was requested before `run` touched the device.
    CancelledBeforeOpen,
}

impl DisconnectReason {
    /// Whether the port was ever opened and configured.
    pub fn was_opened(&self) -> bool {
        matches!(self, Self::ReadFault(_) | Self::Cancelled)
    }

    /// Whether the connection ended because of a fault rather than a request.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::CancelledBeforeOpen)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed(details) => write!(f, "device could not be opened: {details}"),
            Self::ConfigureFailed(details) => write!(f, "port configuration failed: {details}"),
            Self::ReadFault(details) => write!(f, "read failed: {details}"),
            Self::Cancelled => write!(f, "disconnect requested"),
            Self::CancelledBeforeOpen => write!(f, "disconnect requested before open"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_classification() {
        assert!(!DisconnectReason::OpenFailed("gone".into()).was_opened());
        assert!(!DisconnectReason::ConfigureFailed("baud".into()).was_opened());
        assert!(DisconnectReason::ReadFault("pipe".into()).was_opened());
        assert!(DisconnectReason::Cancelled.was_opened());
        assert!(!DisconnectReason::CancelledBeforeOpen.was_opened());

        assert!(DisconnectReason::ReadFault("pipe".into()).is_failure());
        assert!(!DisconnectReason::Cancelled.is_failure());
        assert!(!DisconnectReason::CancelledBeforeOpen.is_failure());
    }

    #[test]
    fn test_reason_display() {
        let reason = DisconnectReason::OpenFailed("Permission denied".into());
        assert_eq!(reason.to_string(), "device could not be opened: Permission denied");
        assert_eq!(DisconnectReason::Cancelled.to_string(), "disconnect requested");
    }

    #[test]
    fn test_reason_serialization() {
        let json = serde_json::to_value(DisconnectReason::ReadFault("EIO".into())).unwrap();
        assert_eq!(json["reason"], "read_fault");
        assert_eq!(json["detail"], "EIO");
    }

    #[test]
    fn test_write_error_display() {
        let err = ConnectionError::Write(PortError::NotOpen);
        assert_eq!(err.to_string(), "Write failed: Port is not open");
    }
}
