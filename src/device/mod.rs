//! Device discovery and acquisition.
//!
//! A [`DeviceManager`] lists the USB serial devices the host currently knows
//! about and hands out a [`DeviceConnection`] for one of them. The connection
//! then yields a claimed port, which the connection core configures and
//! drives.
//!
//! ```text
//! DeviceManager ──open_device──> DeviceConnection ──claim_port(0)──> SerialPortAdapter
//! ```

pub mod mock;
pub mod system;

use crate::port::{PortError, SerialPortAdapter};
use serde::{Deserialize, Serialize};

pub use mock::MockDeviceManager;
pub use system::SystemDeviceManager;

/// A serial-capable USB device as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// System path of the device (e.g. `/dev/ttyUSB0` or `COM3`).
    pub port_name: String,
    /// USB vendor id.
    pub vid: u16,
    /// USB product id.
    pub pid: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

impl DeviceDescriptor {
    /// Descriptor with only a port name and USB ids.
    pub fn new(port_name: impl Into<String>, vid: u16, pid: u16) -> Self {
        Self {
            port_name: port_name.into(),
            vid,
            pid,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }

    /// Name used to identify the device in diagnostics.
    pub fn device_name(&self) -> &str {
        &self.port_name
    }

    /// `VID:PID` in the usual hex notation.
    pub fn usb_id(&self) -> String {
        format!("{:04X}:{:04X}", self.vid, self.pid)
    }

    /// Build a descriptor from enumeration output; `None` for non-USB ports.
    pub fn from_port_info(info: serialport::SerialPortInfo) -> Option<Self> {
        match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => Some(DeviceDescriptor {
                port_name: info.port_name,
                vid: usb.vid,
                pid: usb.pid,
                manufacturer: usb.manufacturer,
                product: usb.product,
                serial_number: usb.serial_number,
            }),
            _ => None,
        }
    }
}

/// Host device subsystem boundary.
pub trait DeviceManager: Send + Sync + std::fmt::Debug {
    /// List attachable serial-capable devices, in enumeration order.
    ///
    /// Purely informational: nothing is opened or claimed.
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, PortError>;

    /// Acquire a connection to the device.
    ///
    /// Fails when the device is gone, access is denied, or the handle is
    /// otherwise unavailable.
    fn open_device(&self, device: &DeviceDescriptor)
        -> Result<Box<dyn DeviceConnection>, PortError>;
}

/// An acquired device connection whose ports can be claimed.
pub trait DeviceConnection: Send + std::fmt::Debug {
    /// Number of serial ports the device exposes.
    fn port_count(&self) -> usize;

    /// Claim the port at `index`, consuming the connection.
    fn claim_port(self: Box<Self>, index: usize) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}

/// List devices known to the host right now.
pub fn list_devices() -> Result<Vec<DeviceDescriptor>, PortError> {
    SystemDeviceManager::new().list_devices()
}
