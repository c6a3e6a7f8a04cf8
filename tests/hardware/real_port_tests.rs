//! Tests requiring an attached USB serial device.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=/dev/ttyUSB0          # or COM3 on Windows
//! export TEST_BAUD=115200                # optional, default: 115200
//! export TEST_LOOPBACK=1                 # if the adapter has TX wired to RX
//!
//! cargo test --features hardware-tests -- --ignored
//! ```

use super::utils::{
    assert_duration_within, print_usb_devices, require_hardware, require_loopback,
    PortTestFixture, TimingHelper,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use usb_serial_link::{
    ConnectionLifecycle, DisconnectReason, FnObserver, SerialConnection, SerialPortAdapter,
    SystemDeviceManager,
};

#[test]
#[ignore]
fn test_real_port_open_close() {
    let Some(config) = require_hardware() else {
        return;
    };

    let mut fixture = PortTestFixture::setup().expect("failed to open TEST_PORT");
    assert_eq!(fixture.port.name(), config.port_name);

    fixture.port.close().expect("close should succeed");
    // A second close is a no-op.
    fixture.port.close().expect("second close should succeed");

    let mut buffer = [0u8; 8];
    assert!(fixture.port.read_bytes(&mut buffer).is_err());
}

#[test]
#[ignore]
fn test_real_port_is_enumerated() {
    let Some(config) = require_hardware() else {
        return;
    };

    print_usb_devices();
    let descriptor = config
        .descriptor()
        .expect("TEST_PORT should be listed as a USB serial device");
    assert_eq!(descriptor.device_name(), config.port_name);
    println!("Found {} [{}]", descriptor.port_name, descriptor.usb_id());
}

#[test]
#[ignore]
fn test_real_port_idle_read_times_out() {
    if require_hardware().is_none() {
        return;
    }

    let mut fixture = PortTestFixture::setup().expect("failed to open TEST_PORT");
    fixture.clear_buffers().expect("failed to clear buffers");
    fixture
        .port
        .set_timeout(Duration::from_millis(200))
        .expect("failed to set timeout");

    let mut buffer = [0u8; 64];
    let timer = TimingHelper::new("idle read");
    let result = fixture.port.read_bytes(&mut buffer);
    let elapsed = timer.finish();

    match result {
        Ok(n) => println!("Device sent {} bytes while idle, skipping timing check", n),
        Err(e) => {
            assert!(e.is_transient(), "idle read should time out, got {}", e);
            assert_duration_within(
                elapsed,
                Duration::from_millis(200),
                Duration::from_millis(150),
                "idle read should block about one timeout",
            );
        }
    }
}

#[test]
#[ignore]
fn test_real_connection_cancels_within_timeout() {
    let Some(config) = require_hardware() else {
        return;
    };
    let descriptor = config
        .descriptor()
        .expect("TEST_PORT should be a USB serial device");

    let settings = config
        .connection_settings()
        .with_read_timeout(Duration::from_millis(100));
    let connection = Arc::new(
        SerialConnection::new(Arc::new(SystemDeviceManager::new()), descriptor, settings)
            .expect("valid settings"),
    );

    let lifecycle = ConnectionLifecycle::spawn(connection.clone()).expect("spawn");
    std::thread::sleep(Duration::from_millis(300));
    assert!(connection.is_open(), "connection should be open");

    let start = Instant::now();
    lifecycle.interrupt();
    let reason = lifecycle.join().expect("join");

    assert_eq!(reason, DisconnectReason::Cancelled);
    assert!(start.elapsed() < Duration::from_millis(600));
}

#[test]
#[ignore]
fn test_real_connection_loopback() {
    let Some(config) = require_loopback() else {
        return;
    };
    let descriptor = config
        .descriptor()
        .expect("TEST_PORT should be a USB serial device");

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let observer = FnObserver::new().on_bytes(move |_, bytes| sink.lock().extend_from_slice(bytes));

    let connection = Arc::new(
        SerialConnection::new(
            Arc::new(SystemDeviceManager::new()),
            descriptor,
            config.connection_settings(),
        )
        .expect("valid settings")
        .with_observer(Arc::new(observer)),
    );
    let lifecycle = ConnectionLifecycle::spawn(connection.clone()).expect("spawn");
    std::thread::sleep(Duration::from_millis(200));

    let payload = b"LOOPBACK TEST\r\n";
    assert_eq!(connection.send(payload).expect("send"), payload.len());

    let deadline = Instant::now() + Duration::from_secs(2);
    while received.lock().len() < payload.len() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    lifecycle.disconnect();
    assert_eq!(lifecycle.join().expect("join"), DisconnectReason::Cancelled);
    assert_eq!(received.lock().as_slice(), payload);
}

#[test]
#[ignore]
fn test_real_port_loopback_without_connection() {
    if require_loopback().is_none() {
        return;
    }

    let mut fixture = PortTestFixture::setup().expect("failed to open TEST_PORT");
    assert!(fixture.is_loopback());
    fixture.clear_buffers().expect("failed to clear buffers");

    let payload = b"ping\n";
    let written = fixture.port.write_bytes(payload).expect("write");
    assert_eq!(written, payload.len());
    std::thread::sleep(Duration::from_millis(100));

    let mut buffer = [0u8; 64];
    let read = fixture.port.read_bytes(&mut buffer).expect("read");
    assert_eq!(&buffer[..read], payload, "on {}", fixture.port_name());
}
