//! Port-specific error types.
//!
//! Defines error types for device and serial port operations, separate from
//! connection-level errors.

use std::io;
use thiserror::Error;

/// Errors that can occur during device or serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The device is not (or no longer) attached.
    #[error("Serial device not found: {0}")]
    NotFound(String),

    /// The host refused access to the device.
    #[error("Permission denied for serial device: {0}")]
    PermissionDenied(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Attempted to use a port that has been closed.
    #[error("Port is not open")]
    NotOpen,

    /// The device has no port at the requested index.
    #[error("Device has no port {index} ({available} available)")]
    NoSuchPort { index: usize, available: usize },

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether a read that failed with this error should simply be retried.
    ///
    /// Timeouts, would-block and interrupted calls mean "no data yet"; every
    /// other error is a fault of the transport.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(e) => is_transient_kind(e.kind()),
            Self::Serial(e) => matches!(e.kind(), serialport::ErrorKind::Io(kind) if is_transient_kind(kind)),
            _ => false,
        }
    }
}

fn is_transient_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Serial device not found: /dev/ttyUSB0");

        let err = PortError::config("Invalid baud rate");
        assert_eq!(err.to_string(), "Configuration error: Invalid baud rate");

        let err = PortError::NoSuchPort {
            index: 0,
            available: 0,
        };
        assert_eq!(err.to_string(), "Device has no port 0 (0 available)");
    }

    #[test]
    fn test_transient_classification() {
        assert!(PortError::Io(io::Error::from(io::ErrorKind::TimedOut)).is_transient());
        assert!(PortError::Io(io::Error::from(io::ErrorKind::WouldBlock)).is_transient());
        assert!(!PortError::Io(io::Error::from(io::ErrorKind::BrokenPipe)).is_transient());
        assert!(!PortError::NotOpen.is_transient());

        let serial = serialport::Error::new(
            serialport::ErrorKind::Io(io::ErrorKind::TimedOut),
            "timed out",
        );
        assert!(PortError::Serial(serial).is_transient());

        let serial = serialport::Error::new(serialport::ErrorKind::NoDevice, "unplugged");
        assert!(!PortError::Serial(serial).is_transient());
    }
}
