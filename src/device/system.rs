//! Device manager backed by the host's serial subsystem via `serialport`.

use super::{DeviceConnection, DeviceDescriptor, DeviceManager};
use crate::port::{LineConfig, PortError, SerialPortAdapter, SyncSerialPort};
use std::time::Duration;
use tracing::debug;

/// Timeout used while the device is acquired; the connection replaces it
/// with its own read timeout once the port is configured.
const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(100);

/// Device manager for the real host.
///
/// Acquiring a device opens its OS handle, which is where the host reports
/// unplugged devices and permission problems. A USB serial node exposes a
/// single port.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDeviceManager;

impl SystemDeviceManager {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceManager for SystemDeviceManager {
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, PortError> {
        let ports = serialport::available_ports()?;
        let devices: Vec<DeviceDescriptor> = ports
            .into_iter()
            .filter_map(DeviceDescriptor::from_port_info)
            .collect();
        debug!(count = devices.len(), "enumerated USB serial devices");
        Ok(devices)
    }

    fn open_device(
        &self,
        device: &DeviceDescriptor,
    ) -> Result<Box<dyn DeviceConnection>, PortError> {
        let port = SyncSerialPort::open(&device.port_name, &LineConfig::default(), ACQUIRE_TIMEOUT)?;
        debug!(device = %device.port_name, "acquired device handle");
        Ok(Box::new(SystemDeviceConnection { port }))
    }
}

/// An opened host device with its single port not yet claimed.
#[derive(Debug)]
struct SystemDeviceConnection {
    port: SyncSerialPort,
}

impl DeviceConnection for SystemDeviceConnection {
    fn port_count(&self) -> usize {
        1
    }

    fn claim_port(self: Box<Self>, index: usize) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        if index != 0 {
            return Err(PortError::NoSuchPort {
                index,
                available: 1,
            });
        }
        Ok(Box::new(self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_fails() {
        let manager = SystemDeviceManager::new();
        let device = DeviceDescriptor::new("/dev/nonexistent_usb_serial_42", 0x0403, 0x6001);
        assert!(manager.open_device(&device).is_err());
    }

    #[test]
    fn test_list_devices_only_reports_usb() {
        // Enumeration may legitimately fail in sandboxes without a device tree.
        if let Ok(devices) = SystemDeviceManager::new().list_devices() {
            for device in devices {
                assert!(!device.port_name.is_empty());
            }
        }
    }
}
