//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::connection::{ConnectionSettings, DEFAULT_MAX_PACKET_LEN, DEFAULT_READ_TIMEOUT};
use crate::port::{DataBits, LineConfig, Parity, StopBits};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial connection defaults
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check every section for values the connection cannot use.
    pub fn validate(&self) -> ConfigResult<()> {
        self.serial.line_config()?;
        if self.serial.max_packet_len == 0 {
            return Err(ConfigError::invalid(
                "serial.max_packet_len",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Serial connection section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits: 5, 6, 7 or 8
    pub data_bits: u8,
    /// Parity: "none", "odd" or "even"
    pub parity: Parity,
    /// Stop bits: 1 or 2
    pub stop_bits: u8,
    /// Receive buffer size in bytes
    pub max_packet_len: usize,
    /// Read/write timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Short names for device paths
    #[serde(default)]
    pub device_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            max_packet_len: DEFAULT_MAX_PACKET_LEN,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
            device_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// Get the read timeout as Duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Resolve a device name through aliases
    pub fn resolve_device(&self, name: &str) -> String {
        self.device_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Line parameters described by this section.
    pub fn line_config(&self) -> ConfigResult<LineConfig> {
        if self.baud_rate == 0 {
            return Err(ConfigError::invalid(
                "serial.baud_rate",
                "must be greater than zero",
            ));
        }
        let data_bits = DataBits::try_from(self.data_bits)
            .map_err(|e| ConfigError::invalid("serial.data_bits", e.to_string()))?;
        let stop_bits = StopBits::try_from(self.stop_bits)
            .map_err(|e| ConfigError::invalid("serial.stop_bits", e.to_string()))?;

        Ok(LineConfig {
            baud_rate: self.baud_rate,
            data_bits,
            parity: self.parity,
            stop_bits,
        })
    }

    /// Connection settings described by this section.
    pub fn connection_settings(&self) -> ConfigResult<ConnectionSettings> {
        Ok(ConnectionSettings {
            line: self.line_config()?,
            max_packet_len: self.max_packet_len,
            read_timeout: self.read_timeout(),
        })
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive, e.g. "info" or "usb_serial_link=debug"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(ConfigError::invalid(
                "logging.format",
                format!("unknown format '{other}'"),
            )),
        }
    }
}
