//! USB serial link library.
//!
//! Bridges a serial-over-USB device to an application's byte pipeline: list
//! attachable devices, bind a [`SerialConnection`] to one, run it on its own
//! thread, and receive bytes and the final disconnect through a
//! [`ConnectionObserver`].
//!
//! # Modules
//!
//! - `device`: device enumeration and acquisition
//! - `port`: serial port abstraction over `serialport`, plus a scripted mock
//! - `connection`: the connection core, its observer and lifecycle thread
//! - `config`: configuration management with TOML support
//! - `error`: connection errors and disconnect reasons
//! - `logging`: `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use usb_serial_link::{
//!     ConnectionLifecycle, ConnectionSettings, DeviceManager, FnObserver, SerialConnection,
//!     SystemDeviceManager,
//! };
//!
//! let manager = Arc::new(SystemDeviceManager::new());
//! let device = manager.list_devices()?.into_iter().next().expect("no device attached");
//!
//! let observer = FnObserver::new()
//!     .on_bytes(|_, bytes| println!("{bytes:02X?}"))
//!     .on_disconnected(|conn, reason| eprintln!("{}: {reason}", conn.display_name()));
//! let connection = SerialConnection::new(manager, device, ConnectionSettings::default())?
//!     .with_observer(Arc::new(observer));
//!
//! let lifecycle = ConnectionLifecycle::spawn(Arc::new(connection))?;
//! lifecycle.connection().send(b"AT\r\n")?;
//! lifecycle.disconnect();
//! let reason = lifecycle.join()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod connection;
pub mod device;
pub mod error;
pub mod logging;
pub mod port;

pub use connection::{
    CancellationFlag, ConnectionLifecycle, ConnectionObserver, ConnectionSettings,
    ConnectionState, FnObserver, SerialConnection,
};
pub use device::{
    list_devices, DeviceConnection, DeviceDescriptor, DeviceManager, MockDeviceManager,
    SystemDeviceManager,
};
pub use error::{ConnectionError, ConnectionResult, DisconnectReason};
pub use port::{
    DataBits, LineConfig, MockRead, MockSerialPort, Parity, PortError, SerialPortAdapter,
    StopBits, SyncSerialPort,
};

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
