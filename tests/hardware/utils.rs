//! Utility functions for hardware testing.
//!
//! Provides helpers for device discovery, fixture setup and timing.

use std::env;
use std::time::{Duration, Instant};
use usb_serial_link::{
    ConnectionSettings, DeviceDescriptor, DeviceManager, LineConfig, SerialPortAdapter,
    SyncSerialPort, SystemDeviceManager,
};

/// Test port configuration from environment.
pub struct TestPortConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub loopback_enabled: bool,
}

impl TestPortConfig {
    /// Read `TEST_PORT`, `TEST_BAUD` (default 115200) and `TEST_LOOPBACK`.
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(115_200);
        let loopback_enabled = env::var("TEST_LOOPBACK").ok().as_deref() == Some("1");

        Some(TestPortConfig {
            port_name,
            baud_rate,
            loopback_enabled,
        })
    }

    pub fn line_config(&self) -> LineConfig {
        LineConfig {
            baud_rate: self.baud_rate,
            ..LineConfig::default()
        }
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::default().with_baud_rate(self.baud_rate)
    }

    /// Find the enumerated descriptor for `TEST_PORT`.
    pub fn descriptor(&self) -> Option<DeviceDescriptor> {
        discover_usb_devices()
            .into_iter()
            .find(|d| d.port_name == self.port_name)
    }
}

/// USB serial devices visible to the system manager.
pub fn discover_usb_devices() -> Vec<DeviceDescriptor> {
    SystemDeviceManager::new()
        .list_devices()
        .unwrap_or_default()
}

/// Print detected devices for debugging.
pub fn print_usb_devices() {
    let devices = discover_usb_devices();

    if devices.is_empty() {
        println!("No USB serial devices detected on this system");
        return;
    }

    println!("USB serial devices ({}):", devices.len());
    for (idx, device) in devices.iter().enumerate() {
        println!("  {}. {} [{}]", idx + 1, device.port_name, device.usb_id());
        if let Some(ref manufacturer) = device.manufacturer {
            println!("     Manufacturer: {}", manufacturer);
        }
        if let Some(ref product) = device.product {
            println!("     Product: {}", product);
        }
        if let Some(ref serial) = device.serial_number {
            println!("     Serial: {}", serial);
        }
    }
}

/// Timing helper for measuring operation duration.
pub struct TimingHelper {
    start: Instant,
    name: String,
}

impl TimingHelper {
    pub fn new(name: &str) -> Self {
        println!("Starting: {}", name);
        TimingHelper {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        println!("Completed: {} in {:?}", self.name, elapsed);
        elapsed
    }
}

/// An opened port plus the environment it came from.
pub struct PortTestFixture {
    pub port: SyncSerialPort,
    config: TestPortConfig,
}

impl PortTestFixture {
    pub fn setup() -> Option<Self> {
        let config = TestPortConfig::from_env()?;

        println!(
            "Setting up test fixture for {} at {} baud",
            config.port_name, config.baud_rate
        );

        let port = match SyncSerialPort::open(
            &config.port_name,
            &config.line_config(),
            Duration::from_millis(1000),
        ) {
            Ok(p) => p,
            Err(e) => {
                println!("Failed to open port: {}", e);
                return None;
            }
        };

        Some(PortTestFixture { port, config })
    }

    pub fn is_loopback(&self) -> bool {
        self.config.loopback_enabled
    }

    pub fn port_name(&self) -> &str {
        &self.config.port_name
    }

    pub fn clear_buffers(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.port.clear_buffers()?;
        Ok(())
    }
}

/// Returns the configuration, or prints why the test is skipped.
pub fn require_hardware() -> Option<TestPortConfig> {
    let config = TestPortConfig::from_env();
    if config.is_none() {
        println!("Skipping: TEST_PORT environment variable not set");
        println!("   Set TEST_PORT=/dev/ttyUSB0 (or COM3) to run hardware tests");
    }
    config
}

/// Like [`require_hardware`], but also requires `TEST_LOOPBACK=1`.
pub fn require_loopback() -> Option<TestPortConfig> {
    let config = require_hardware()?;
    if !config.loopback_enabled {
        println!("Skipping: TEST_LOOPBACK not set to 1");
        println!("   This test requires a loopback adapter (TX connected to RX)");
        return None;
    }
    Some(config)
}

/// Assert that duration is within expected range.
pub fn assert_duration_within(
    actual: Duration,
    expected: Duration,
    tolerance: Duration,
    message: &str,
) {
    let lower = expected.saturating_sub(tolerance);
    let upper = expected + tolerance;

    assert!(
        actual >= lower && actual <= upper,
        "{}: expected {:?} ± {:?}, got {:?}",
        message,
        expected,
        tolerance,
        actual
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_usb_devices() {
        // Depends on the host, so only check it does not panic.
        let devices = discover_usb_devices();
        println!("Found {} USB serial devices", devices.len());
    }

    #[test]
    fn test_timing_helper() {
        let timer = TimingHelper::new("test operation");
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.finish();
        assert!(elapsed >= Duration::from_millis(10));
    }

    #[test]
    fn test_assert_duration_within() {
        assert_duration_within(
            Duration::from_millis(100),
            Duration::from_millis(95),
            Duration::from_millis(10),
            "should be within tolerance",
        );
    }

    #[test]
    #[should_panic]
    fn test_assert_duration_out_of_range() {
        assert_duration_within(
            Duration::from_millis(200),
            Duration::from_millis(100),
            Duration::from_millis(10),
            "should panic",
        );
    }
}
