//! In-memory device manager for tests.

use super::{DeviceConnection, DeviceDescriptor, DeviceManager};
use crate::port::{MockSerialPort, PortError, SerialPortAdapter};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MockManagerState {
    devices: Vec<(DeviceDescriptor, MockSerialPort)>,
    open_failure: Option<String>,
    port_count: Option<usize>,
    open_calls: usize,
}

/// Device manager over [`MockSerialPort`]s.
///
/// Devices are reported in insertion order. Acquisition can be made to fail
/// with a permission error, and the number of ports a device exposes can be
/// overridden to exercise the claim path.
///
/// # Example
/// ```
/// use usb_serial_link::device::{DeviceManager, MockDeviceManager};
///
/// let manager = MockDeviceManager::new();
/// let port = manager.add_device("MOCK0");
/// port.enqueue_read(b"hi");
///
/// assert_eq!(manager.list_devices().unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDeviceManager {
    state: Arc<Mutex<MockManagerState>>,
}

impl MockDeviceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device and return the mock port behind it.
    pub fn add_device(&self, port_name: &str) -> MockSerialPort {
        let port = MockSerialPort::new(port_name);
        let descriptor = DeviceDescriptor::new(port_name, 0x0403, 0x6001);
        self.add_device_with(descriptor, port.clone());
        port
    }

    /// Register a device with an explicit descriptor and port.
    pub fn add_device_with(&self, descriptor: DeviceDescriptor, port: MockSerialPort) {
        self.state.lock().devices.push((descriptor, port));
    }

    /// Remove a device, as if it had been unplugged.
    pub fn unplug(&self, port_name: &str) {
        self.state
            .lock()
            .devices
            .retain(|(d, _)| d.port_name != port_name);
    }

    /// Make every `open_device` call fail with a permission error.
    pub fn fail_open(&self, reason: impl Into<String>) {
        self.state.lock().open_failure = Some(reason.into());
    }

    /// Override the number of ports acquired devices expose.
    pub fn set_port_count(&self, count: usize) {
        self.state.lock().port_count = Some(count);
    }

    /// Number of `open_device` calls made.
    pub fn open_calls(&self) -> usize {
        self.state.lock().open_calls
    }

    /// Descriptor of a registered device.
    pub fn descriptor(&self, port_name: &str) -> Option<DeviceDescriptor> {
        self.state
            .lock()
            .devices
            .iter()
            .find(|(d, _)| d.port_name == port_name)
            .map(|(d, _)| d.clone())
    }
}

impl DeviceManager for MockDeviceManager {
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, PortError> {
        Ok(self
            .state
            .lock()
            .devices
            .iter()
            .map(|(d, _)| d.clone())
            .collect())
    }

    fn open_device(
        &self,
        device: &DeviceDescriptor,
    ) -> Result<Box<dyn DeviceConnection>, PortError> {
        let mut state = self.state.lock();
        state.open_calls += 1;

        if let Some(reason) = &state.open_failure {
            return Err(PortError::PermissionDenied(reason.clone()));
        }

        let port = state
            .devices
            .iter()
            .find(|(d, _)| d.port_name == device.port_name)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| PortError::not_found(&device.port_name))?;

        Ok(Box::new(MockDeviceConnection {
            port,
            port_count: state.port_count.unwrap_or(1),
        }))
    }
}

#[derive(Debug)]
struct MockDeviceConnection {
    port: MockSerialPort,
    port_count: usize,
}

impl DeviceConnection for MockDeviceConnection {
    fn port_count(&self) -> usize {
        self.port_count
    }

    fn claim_port(self: Box<Self>, index: usize) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        if index >= self.port_count {
            return Err(PortError::NoSuchPort {
                index,
                available: self.port_count,
            });
        }
        Ok(Box::new(self.port))
    }
}
