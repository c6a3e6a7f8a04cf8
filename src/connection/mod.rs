//! The serial connection core.
//!
//! A [`SerialConnection`] owns one USB serial endpoint for its whole life:
//! it acquires the device, claims and configures port 0, reads until it is
//! cancelled or the transport faults, and reports the end of the run to its
//! observer exactly once.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──run──> Running ──(cancel | fault | open failure)──> Closed
//! ```
//!
//! `Closed` is terminal; a connection is never re-opened.
//!
//! # Concurrency
//!
//! The read loop runs on the thread that calls [`SerialConnection::run`]
//! (normally a [`ConnectionLifecycle`]) and reads through its own handle.
//! Sends may come from any thread; they go through a second handle kept in a
//! mutex slot, which is also where [`SerialConnection::disconnect`] takes the
//! port from, so a send never races a close.

pub mod lifecycle;
pub mod observer;
pub mod settings;

use crate::device::{DeviceDescriptor, DeviceManager};
use crate::error::{ConnectionError, ConnectionResult, DisconnectReason};
use crate::port::{PortError, SerialPortAdapter};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use lifecycle::{CancellationFlag, ConnectionLifecycle};
pub use observer::{ConnectionObserver, FnObserver};
pub use settings::{ConnectionSettings, DEFAULT_MAX_PACKET_LEN, DEFAULT_READ_TIMEOUT};

/// Index of the port used on multi-port devices.
const PORT_INDEX: usize = 0;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Constructed; no hardware touched.
    Idle,
    /// `run` is executing.
    Running,
    /// `run` returned. Terminal.
    Closed,
}

/// A single USB serial endpoint.
pub struct SerialConnection {
    manager: Arc<dyn DeviceManager>,
    device: DeviceDescriptor,
    settings: ConnectionSettings,
    display_name: String,
    /// Write handle; present while the port is open.
    port: Mutex<Option<Box<dyn SerialPortAdapter>>>,
    state: Mutex<ConnectionState>,
    cancel: CancellationFlag,
    observer: RwLock<Option<Arc<dyn ConnectionObserver>>>,
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
}

impl SerialConnection {
    /// Bind a connection to `device`. Nothing is opened until [`run`](Self::run).
    pub fn new(
        manager: Arc<dyn DeviceManager>,
        device: DeviceDescriptor,
        settings: ConnectionSettings,
    ) -> ConnectionResult<Self> {
        settings.validate()?;
        let display_name = format!("usb serial: {}", device.device_name());

        Ok(Self {
            manager,
            device,
            settings,
            display_name,
            port: Mutex::new(None),
            state: Mutex::new(ConnectionState::Idle),
            cancel: CancellationFlag::new(),
            observer: RwLock::new(None),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        })
    }

    /// Bind a connection with 115200 8N1, a 1024-byte buffer and a 100 ms timeout.
    pub fn with_defaults(
        manager: Arc<dyn DeviceManager>,
        device: DeviceDescriptor,
    ) -> ConnectionResult<Self> {
        Self::new(manager, device, ConnectionSettings::default())
    }

    /// Builder form of [`set_observer`](Self::set_observer).
    pub fn with_observer(self, observer: Arc<dyn ConnectionObserver>) -> Self {
        self.set_observer(Some(observer));
        self
    }

    /// Install or clear the observer. `None` makes notifications no-ops.
    pub fn set_observer(&self, observer: Option<Arc<dyn ConnectionObserver>>) {
        *self.observer.write() = observer;
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Whether the port is open and not yet closed.
    pub fn is_open(&self) -> bool {
        self.port.lock().is_some()
    }

    /// The flag the read loop polls.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Open the device and read until cancelled or faulted.
    ///
    /// Blocks the calling thread. Every run that gets past the state check
    /// ends with exactly one `on_disconnected` notification, whose reason is
    /// also returned. Fails only when the connection has already run.
    pub fn run(&self) -> ConnectionResult<DisconnectReason> {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Idle {
                return Err(ConnectionError::AlreadyStarted(self.display_name.clone()));
            }
            *state = ConnectionState::Running;
        }

        let reason = match self.open() {
            Ok(reader) => self.read_loop(reader),
            Err(reason) => reason,
        };

        self.release();
        *self.state.lock() = ConnectionState::Closed;
        info!(connection = %self.display_name, %reason, "disconnected");
        self.notify_disconnected(&reason);
        Ok(reason)
    }

    /// Write `bytes` to the port, bounded by the read timeout.
    ///
    /// Empty input, or a port that is not open, is a silent no-op returning
    /// `Ok(0)`. A transport failure is returned but leaves the read loop
    /// running.
    pub fn send(&self, bytes: &[u8]) -> ConnectionResult<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }

        let mut slot = self.port.lock();
        let Some(port) = slot.as_mut() else {
            debug!(connection = %self.display_name, len = bytes.len(), "port not open, dropping write");
            return Ok(0);
        };

        match port.write_bytes(bytes) {
            Ok(written) => {
                self.bytes_sent.fetch_add(written as u64, Ordering::Relaxed);
                Ok(written)
            }
            Err(e) => {
                warn!(connection = %self.display_name, error = %e, "write failed");
                Err(ConnectionError::Write(e))
            }
        }
    }

    /// Stop the read loop and close the port.
    ///
    /// Idempotent and callable from any thread. A read in flight returns
    /// within one timeout and the loop exits with
    /// [`DisconnectReason::Cancelled`].
    pub fn disconnect(&self) {
        self.cancel.cancel();
        let port = self.port.lock().take();
        match port {
            Some(mut port) => {
                info!(connection = %self.display_name, "closing port");
                if let Err(e) = port.close() {
                    warn!(connection = %self.display_name, error = %e, "error while closing port");
                }
            }
            None => debug!(connection = %self.display_name, "disconnect: port already closed"),
        }
    }

    /// Acquire, claim and configure the port. Returns the read handle.
    fn open(&self) -> Result<Box<dyn SerialPortAdapter>, DisconnectReason> {
        if self.cancel.is_cancelled() {
            return Err(DisconnectReason::CancelledBeforeOpen);
        }

        let device = self.manager.open_device(&self.device).map_err(|e| {
            debug!(connection = %self.display_name, error = %e, "device acquisition failed");
            DisconnectReason::OpenFailed(e.to_string())
        })?;

        let available = device.port_count();
        if available <= PORT_INDEX {
            let e = PortError::NoSuchPort {
                index: PORT_INDEX,
                available,
            };
            warn!(connection = %self.display_name, error = %e, "device exposes no usable port");
            return Err(DisconnectReason::ConfigureFailed(e.to_string()));
        }

        let mut port = device.claim_port(PORT_INDEX).map_err(|e| {
            warn!(connection = %self.display_name, error = %e, "failed to claim port");
            DisconnectReason::ConfigureFailed(e.to_string())
        })?;

        let configured = port
            .configure(&self.settings.line)
            .and_then(|()| port.set_timeout(self.settings.read_timeout))
            .and_then(|()| port.try_clone_port());
        let reader = match configured {
            Ok(reader) => reader,
            Err(e) => {
                warn!(connection = %self.display_name, error = %e, "failed to configure port");
                if let Err(e) = port.close() {
                    debug!(connection = %self.display_name, error = %e, "error while closing port");
                }
                return Err(DisconnectReason::ConfigureFailed(e.to_string()));
            }
        };

        info!(
            connection = %self.display_name,
            line = %self.settings.line,
            timeout_ms = self.settings.read_timeout.as_millis() as u64,
            "port opened"
        );
        *self.port.lock() = Some(port);
        Ok(reader)
    }

    fn read_loop(&self, mut reader: Box<dyn SerialPortAdapter>) -> DisconnectReason {
        let mut buffer = vec![0u8; self.settings.max_packet_len];

        let reason = loop {
            if self.cancel.is_cancelled() {
                break DisconnectReason::Cancelled;
            }

            match reader.read_bytes(&mut buffer) {
                Ok(0) => {}
                Ok(n) => {
                    self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
                    self.notify_bytes(&buffer[..n]);
                }
                Err(e) if e.is_transient() => {}
                Err(e) if self.cancel.is_cancelled() => {
                    debug!(connection = %self.display_name, error = %e, "read interrupted by disconnect");
                    break DisconnectReason::Cancelled;
                }
                Err(e) => {
                    warn!(connection = %self.display_name, error = %e, "read failed, stopping");
                    break DisconnectReason::ReadFault(e.to_string());
                }
            }
        };

        // Empty the write slot first so no send reaches a handle closed below.
        self.release();
        if let Err(e) = reader.close() {
            debug!(connection = %self.display_name, error = %e, "error while closing read handle");
        }
        reason
    }

    /// Close the write handle if `disconnect` has not already done so.
    fn release(&self) {
        let port = self.port.lock().take();
        if let Some(mut port) = port {
            if let Err(e) = port.close() {
                debug!(connection = %self.display_name, error = %e, "error while closing port");
            }
        }
    }

    fn current_observer(&self) -> Option<Arc<dyn ConnectionObserver>> {
        self.observer.read().clone()
    }

    fn notify_bytes(&self, bytes: &[u8]) {
        if let Some(observer) = self.current_observer() {
            observer.on_bytes_received(self, bytes);
        }
    }

    fn notify_disconnected(&self, reason: &DisconnectReason) {
        if let Some(observer) = self.current_observer() {
            observer.on_disconnected(self, reason);
        }
    }
}

impl std::fmt::Debug for SerialConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialConnection")
            .field("display_name", &self.display_name)
            .field("settings", &self.settings)
            .field("state", &self.state())
            .field("open", &self.is_open())
            .finish()
    }
}
