//! Dedicated execution context for a connection.
//!
//! Each connection runs its blocking read loop on its own named OS thread.
//! Shutdown is cooperative: the loop polls a [`CancellationFlag`] between
//! reads, so the worst-case latency is one read timeout plus one
//! notification.

use super::SerialConnection;
use crate::error::{ConnectionError, ConnectionResult, DisconnectReason};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Shared interruption flag polled by the read loop.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the loop stop at its next iteration boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle to a connection running on its own thread.
///
/// Dropping the handle without joining disconnects the connection and
/// detaches the thread.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    connection: Arc<SerialConnection>,
    handle: Option<JoinHandle<ConnectionResult<DisconnectReason>>>,
}

impl ConnectionLifecycle {
    /// Start `connection.run()` on a new thread named after the device.
    pub fn spawn(connection: Arc<SerialConnection>) -> ConnectionResult<Self> {
        let name = format!("usb-serial:{}", connection.device().device_name());
        let runner = Arc::clone(&connection);
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || runner.run())
            .map_err(ConnectionError::Spawn)?;
        debug!(connection = %connection.display_name(), "connection thread started");

        Ok(Self {
            connection,
            handle: Some(handle),
        })
    }

    pub fn connection(&self) -> &Arc<SerialConnection> {
        &self.connection
    }

    /// Set the interruption flag without touching the port.
    pub fn interrupt(&self) {
        self.connection.cancellation().cancel();
    }

    /// Interrupt the loop and close the port.
    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    /// Whether the run routine has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the run routine to return.
    pub fn join(mut self) -> ConnectionResult<DisconnectReason> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ConnectionError::Panicked(self.connection.display_name().to_string()))?,
            None => unreachable!("the handle is only taken by join, which consumes self"),
        }
    }
}

impl Drop for ConnectionLifecycle {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.connection.disconnect();
        }
    }
}
