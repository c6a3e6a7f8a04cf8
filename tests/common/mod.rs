//! Shared test utilities for connection tests.
//!
//! Provides:
//! - a recording observer that keeps the order of notifications
//! - builders wiring a `SerialConnection` to a `MockDeviceManager`
//! - polling helpers for conditions reached on the connection thread

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use usb_serial_link::{
    ConnectionObserver, ConnectionSettings, DisconnectReason, MockDeviceManager, MockSerialPort,
    SerialConnection,
};

pub const MOCK_DEVICE: &str = "/dev/ttyMOCK0";

/// One notification, in the order it was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Bytes(Vec<u8>),
    Disconnected(DisconnectReason),
}

/// Observer that records every notification and the thread it ran on.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
    threads: Mutex<Vec<Option<String>>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn received(&self) -> Vec<Vec<u8>> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Bytes(bytes) => Some(bytes.clone()),
                Event::Disconnected(_) => None,
            })
            .collect()
    }

    pub fn disconnects(&self) -> Vec<DisconnectReason> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Disconnected(reason) => Some(reason.clone()),
                Event::Bytes(_) => None,
            })
            .collect()
    }

    pub fn thread_names(&self) -> Vec<Option<String>> {
        self.threads.lock().clone()
    }

    fn record_thread(&self) {
        let name = std::thread::current().name().map(str::to_string);
        self.threads.lock().push(name);
    }
}

impl ConnectionObserver for RecordingObserver {
    fn on_bytes_received(&self, _connection: &SerialConnection, bytes: &[u8]) {
        self.record_thread();
        self.events.lock().push(Event::Bytes(bytes.to_vec()));
    }

    fn on_disconnected(&self, _connection: &SerialConnection, reason: &DisconnectReason) {
        self.record_thread();
        self.events.lock().push(Event::Disconnected(reason.clone()));
    }
}

/// Everything a connection test needs to drive and inspect one connection.
pub struct Harness {
    pub manager: MockDeviceManager,
    pub port: MockSerialPort,
    pub observer: Arc<RecordingObserver>,
    pub connection: Arc<SerialConnection>,
}

/// Build a connection to a single mock device with the given settings.
pub fn harness(settings: ConnectionSettings) -> Harness {
    let manager = MockDeviceManager::new();
    let port = manager.add_device(MOCK_DEVICE);
    let device = manager
        .descriptor(MOCK_DEVICE)
        .expect("mock device was just registered");
    let observer = Arc::new(RecordingObserver::default());

    let connection = SerialConnection::new(Arc::new(manager.clone()), device, settings)
        .expect("settings are valid")
        .with_observer(observer.clone());

    Harness {
        manager,
        port,
        observer,
        connection: Arc::new(connection),
    }
}

/// Harness whose reads time out after `timeout_ms`.
pub fn harness_with_timeout(timeout_ms: u64) -> Harness {
    harness(ConnectionSettings::default().with_read_timeout(Duration::from_millis(timeout_ms)))
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
