//! Per-connection settings.

use crate::error::{ConnectionError, ConnectionResult};
use crate::port::{DataBits, LineConfig, Parity, StopBits};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default size of the receive buffer.
pub const DEFAULT_MAX_PACKET_LEN: usize = 1024;

/// Default bound on each blocking read or write.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Line parameters plus the read-loop tuning of one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Line parameters applied after the port is claimed.
    pub line: LineConfig,
    /// Size in bytes of the reusable receive buffer.
    pub max_packet_len: usize,
    /// Bound on each read and write. Zero returns immediately when no data
    /// is available.
    pub read_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            line: LineConfig::default(),
            max_packet_len: DEFAULT_MAX_PACKET_LEN,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl ConnectionSettings {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.line.baud_rate = baud_rate;
        self
    }

    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.line.data_bits = data_bits;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.line.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.line.stop_bits = stop_bits;
        self
    }

    pub fn with_max_packet_len(mut self, max_packet_len: usize) -> Self {
        self.max_packet_len = max_packet_len;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Reject settings the read loop cannot run with.
    pub fn validate(&self) -> ConnectionResult<()> {
        if self.max_packet_len == 0 {
            return Err(ConnectionError::InvalidSettings(
                "max_packet_len must be greater than zero".to_string(),
            ));
        }
        if self.line.baud_rate == 0 {
            return Err(ConnectionError::InvalidSettings(
                "baud_rate must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
