//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own
//! `SerialPortAdapter` trait for dependency injection and testing.

use super::error::PortError;
use super::traits::{LineConfig, SerialPortAdapter};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port; `None` once closed.
    port: Option<Box<dyn serialport::SerialPort>>,
    /// The port name/path for identification.
    name: String,
}

impl SyncSerialPort {
    /// Open a serial port with the given line parameters and timeout.
    ///
    /// Flow control is always disabled.
    ///
    /// # Example
    /// ```no_run
    /// use std::time::Duration;
    /// use usb_serial_link::port::{LineConfig, SyncSerialPort};
    ///
    /// let port = SyncSerialPort::open("/dev/ttyUSB0", &LineConfig::default(), Duration::from_millis(100))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, line: &LineConfig, timeout: Duration) -> Result<Self, PortError> {
        let port = serialport::new(port_name, line.baud_rate)
            .data_bits(line.data_bits.into())
            .flow_control(serialport::FlowControl::None)
            .parity(line.parity.into())
            .stop_bits(line.stop_bits.into())
            .timeout(timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                serialport::ErrorKind::Io(io::ErrorKind::NotFound) => {
                    PortError::not_found(port_name)
                }
                serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
                    PortError::PermissionDenied(port_name.to_string())
                }
                _ => PortError::Serial(e),
            })?;

        Ok(Self {
            port: Some(port),
            name: port_name.to_string(),
        })
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, PortError> {
        self.port.as_mut().ok_or(PortError::NotOpen)
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn configure(&mut self, line: &LineConfig) -> Result<(), PortError> {
        let port = self.port_mut()?;
        let to_config = |e: serialport::Error| PortError::config(e.to_string());
        port.set_baud_rate(line.baud_rate).map_err(to_config)?;
        port.set_data_bits(line.data_bits.into()).map_err(to_config)?;
        port.set_parity(line.parity.into()).map_err(to_config)?;
        port.set_stop_bits(line.stop_bits.into()).map_err(to_config)?;
        port.set_flow_control(serialport::FlowControl::None)
            .map_err(to_config)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.port_mut()?
            .set_timeout(timeout)
            .map_err(PortError::Serial)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port_mut()?.read(buffer).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.port_mut()?
            .clear(serialport::ClearBuffer::All)
            .map_err(PortError::Serial)
    }

    fn try_clone_port(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let port = self.port.as_ref().ok_or(PortError::NotOpen)?.try_clone()?;
        Ok(Box::new(Self {
            port: Some(port),
            name: self.name.clone(),
        }))
    }

    fn close(&mut self) -> Result<(), PortError> {
        // Dropping the boxed port closes the OS handle.
        self.port.take();
        Ok(())
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field(
                "baud_rate",
                &self.port.as_ref().and_then(|p| p.baud_rate().ok()),
            )
            .field("open", &self.port.is_some())
            .finish()
    }
}
