//! Configuration module for usb-serial.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `USB_SERIAL_CONFIG` environment variable (explicit path)
//! 2. `./usb-serial.toml` (current directory)
//! 3. `usb-serial.toml` in the platform config directory
//!    (`~/.config/usb-serial/` on Linux, `%APPDATA%\usb-serial\config\` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `USB_SERIAL_<SECTION>_<KEY>`
//!
//! - `USB_SERIAL_SERIAL_BAUD_RATE=9600`
//! - `USB_SERIAL_SERIAL_READ_TIMEOUT_MS=250`
//! - `USB_SERIAL_SERIAL_MAX_PACKET_LEN=4096`
//! - `USB_SERIAL_LOGGING_LEVEL=debug`
//! - `USB_SERIAL_LOGGING_FORMAT=json`
//!
//! # Example
//!
//! ```rust,no_run
//! use usb_serial_link::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let settings = loader.config().serial.connection_settings()?;
//! println!("line: {}", settings.line);
//! # Ok::<(), usb_serial_link::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
