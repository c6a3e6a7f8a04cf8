//! Port abstraction layer for serial communication.
//!
//! Provides the `SerialPortAdapter` trait with a `serialport`-backed
//! implementation and a scripted mock, enabling dependency injection and
//! testing without hardware.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockRead, MockSerialPort};
pub use sync_port::*;
pub use traits::*;
