//! Notification sinks for connection events.

use super::SerialConnection;
use crate::error::DisconnectReason;

/// Receives the events of one connection.
///
/// Both methods run on the connection's own thread, so they should return
/// quickly; the next read does not start until `on_bytes_received` returns.
/// Observers that need another context must hand the data off themselves.
pub trait ConnectionObserver: Send + Sync {
    /// Bytes arrived. The slice borrows the receive buffer and is only valid
    /// for the duration of the call; copy it to keep it.
    fn on_bytes_received(&self, _connection: &SerialConnection, _bytes: &[u8]) {}

    /// The connection ended. Called exactly once per run.
    fn on_disconnected(&self, _connection: &SerialConnection, _reason: &DisconnectReason) {}
}

type BytesFn = dyn Fn(&SerialConnection, &[u8]) + Send + Sync;
type DisconnectedFn = dyn Fn(&SerialConnection, &DisconnectReason) + Send + Sync;

/// Observer assembled from optional closures; a missing closure is a no-op.
///
/// # Example
/// ```
/// use usb_serial_link::connection::FnObserver;
///
/// let observer = FnObserver::new()
///     .on_bytes(|conn, bytes| println!("{}: {} bytes", conn.display_name(), bytes.len()))
///     .on_disconnected(|conn, reason| println!("{} closed: {reason}", conn.display_name()));
/// ```
#[derive(Default)]
pub struct FnObserver {
    bytes: Option<Box<BytesFn>>,
    disconnected: Option<Box<DisconnectedFn>>,
}

impl FnObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_bytes<F>(mut self, f: F) -> Self
    where
        F: Fn(&SerialConnection, &[u8]) + Send + Sync + 'static,
    {
        self.bytes = Some(Box::new(f));
        self
    }

    pub fn on_disconnected<F>(mut self, f: F) -> Self
    where
        F: Fn(&SerialConnection, &DisconnectReason) + Send + Sync + 'static,
    {
        self.disconnected = Some(Box::new(f));
        self
    }
}

impl ConnectionObserver for FnObserver {
    fn on_bytes_received(&self, connection: &SerialConnection, bytes: &[u8]) {
        if let Some(f) = &self.bytes {
            f(connection, bytes);
        }
    }

    fn on_disconnected(&self, connection: &SerialConnection, reason: &DisconnectReason) {
        if let Some(f) = &self.disconnected {
            f(connection, reason);
        }
    }
}

impl std::fmt::Debug for FnObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnObserver")
            .field("bytes", &self.bytes.is_some())
            .field("disconnected", &self.disconnected.is_some())
            .finish()
    }
}
