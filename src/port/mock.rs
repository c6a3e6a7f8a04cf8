//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates serial port behavior without
//! requiring actual hardware. Reads follow a script of data chunks, timeouts
//! and faults; writes and closes are recorded for later inspection.

use super::error::PortError;
use super::traits::{LineConfig, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// One scripted outcome for a read call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRead {
    /// Deliver these bytes (split across reads if the buffer is smaller).
    Data(Vec<u8>),
    /// Return `Ok(0)` immediately.
    Empty,
    /// Block for the configured timeout, then report a timeout.
    Timeout,
    /// Fail with an I/O error of this kind.
    Fault(io::ErrorKind),
}

/// Inner state of the mock port, shared by every handle cloned from it.
#[derive(Debug)]
struct MockPortState {
    /// Scripted read outcomes; an empty script behaves like `MockRead::Timeout`.
    reads: VecDeque<MockRead>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Configured timeout duration.
    timeout: Duration,
    /// Line parameters applied by the last successful `configure`.
    line: Option<LineConfig>,
    /// Error message returned by `configure`, if set.
    configure_error: Option<String>,
    /// Whether writes should fail with a broken pipe.
    fail_writes: bool,
    /// Whether the port has been closed.
    closed: bool,
    /// Number of `close` calls that released the port.
    close_count: usize,
    /// Number of read calls made.
    read_calls: usize,
    /// Whether buffers have been cleared.
    buffers_cleared: bool,
}

/// Mock serial port implementation for testing.
///
/// Clones (including those made through [`SerialPortAdapter::try_clone_port`])
/// share one state, so closing any handle invalidates all of them.
///
/// # Example
/// ```
/// use usb_serial_link::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"Hello, World!");
///
/// let mut buffer = [0u8; 13];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello, World!");
///
/// port.write_bytes(b"Response").unwrap();
/// assert_eq!(port.write_log(), vec![b"Response".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, shared across clones.
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                reads: VecDeque::new(),
                write_log: Vec::new(),
                timeout: Duration::from_millis(100),
                line: None,
                configure_error: None,
                fail_writes: false,
                closed: false,
                close_count: 0,
                read_calls: 0,
                buffers_cleared: false,
            })),
        }
    }

    /// Queue a chunk of bytes to be returned by a read.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.enqueue(MockRead::Data(data.to_vec()));
    }

    /// Queue a read that times out.
    pub fn enqueue_timeout(&self) {
        self.enqueue(MockRead::Timeout);
    }

    /// Queue a read that fails with the given I/O error kind.
    pub fn enqueue_fault(&self, kind: io::ErrorKind) {
        self.enqueue(MockRead::Fault(kind));
    }

    /// Queue an arbitrary read outcome.
    pub fn enqueue(&self, read: MockRead) {
        self.state.lock().reads.push_back(read);
    }

    /// Make `configure` fail with the given message.
    pub fn fail_configure(&self, message: impl Into<String>) {
        self.state.lock().configure_error = Some(message.into());
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Get a copy of all data written to the port.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Line parameters applied by the last `configure`.
    pub fn configured_line(&self) -> Option<LineConfig> {
        self.state.lock().line
    }

    /// The timeout last set on the port.
    pub fn timeout(&self) -> Duration {
        self.state.lock().timeout
    }

    /// Whether the port has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of close calls that actually released the port.
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    /// Number of read calls made so far.
    pub fn read_calls(&self) -> usize {
        self.state.lock().read_calls
    }

    /// Number of scripted reads not yet consumed.
    pub fn pending_reads(&self) -> usize {
        self.state.lock().reads.len()
    }

    /// Whether buffers have been cleared.
    pub fn was_cleared(&self) -> bool {
        self.state.lock().buffers_cleared
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn configure(&mut self, line: &LineConfig) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PortError::NotOpen);
        }
        if let Some(message) = state.configure_error.clone() {
            return Err(PortError::config(message));
        }
        state.line = Some(*line);
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.state.lock().timeout = timeout;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PortError::NotOpen);
        }
        if state.fail_writes {
            return Err(PortError::Io(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        state.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let (next, timeout) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(PortError::NotOpen);
            }
            state.read_calls += 1;
            (state.reads.pop_front(), state.timeout)
        };

        match next {
            Some(MockRead::Data(mut bytes)) => {
                let n = bytes.len().min(buffer.len());
                buffer[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    let rest = bytes.split_off(n);
                    self.state.lock().reads.push_front(MockRead::Data(rest));
                }
                Ok(n)
            }
            Some(MockRead::Empty) => Ok(0),
            Some(MockRead::Fault(kind)) => Err(PortError::Io(io::Error::from(kind))),
            Some(MockRead::Timeout) | None => {
                // The lock is released while "blocked" so other handles stay usable.
                std::thread::sleep(timeout);
                Err(PortError::Io(io::Error::from(io::ErrorKind::TimedOut)))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.reads.clear();
        state.buffers_cleared = true;
        Ok(())
    }

    fn try_clone_port(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        if self.is_closed() {
            return Err(PortError::NotOpen);
        }
        Ok(Box::new(self.clone()))
    }

    fn close(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            state.close_count += 1;
        }
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("pending_reads", &self.pending_reads())
            .field("closed", &self.is_closed())
            .finish()
    }
}
