//! Mock serial transport for testing.
//!
//! Provides a `MockSerialPort` that simulates a serial endpoint without
//! requiring hardware. Reads are served from a queue, writes are logged, and
//! in loopback mode every write is fed back into the read queue, the same as
//! a device with TX shorted to RX.

use super::error::PortError;
use super::traits::SerialTransport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Inner state of the mock port, shared between clones.
#[derive(Debug)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all writes accepted by the port.
    write_log: Vec<Vec<u8>>,
    /// Feed accepted writes back into `read_queue`.
    loopback: bool,
    open: bool,
    /// Upper bound on bytes handed out per read call.
    max_read_chunk: Option<usize>,
    /// Upper bound on bytes accepted per write call.
    max_write_chunk: Option<usize>,
    /// Errors returned by upcoming reads, before any data.
    pending_read_errors: VecDeque<std::io::ErrorKind>,
    read_calls: usize,
}

impl Default for MockPortState {
    fn default() -> Self {
        Self {
            read_queue: VecDeque::new(),
            write_log: Vec::new(),
            loopback: false,
            open: true,
            max_read_chunk: None,
            max_write_chunk: None,
            pending_read_errors: VecDeque::new(),
            read_calls: 0,
        }
    }
}

/// Mock serial transport for testing.
///
/// This implementation allows you to:
/// - Enqueue data to be returned by read operations
/// - Inspect what data was written
/// - Loop writes back into reads
/// - Force short reads/writes and injected I/O errors
///
/// An empty read queue makes `read_bytes` return `Ok(0)`, as a real port
/// does when its VTIME interval expires without data.
///
/// # Example
/// ```
/// use linux_serial::{BlockingTransfer, MockSerialPort};
///
/// let mut port = MockSerialPort::loopback("LOOP0");
/// let written = port.write_text("hello").unwrap();
/// assert_eq!(port.read_text(written).unwrap(), "hello");
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, shared so test code can inspect a clone.
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new, open mock port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Create a mock port whose writes come back as reads.
    pub fn loopback(name: impl Into<String>) -> Self {
        let port = Self::new(name);
        port.state.lock().loopback = true;
        port
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// All written bytes, concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state.lock().write_log.concat()
    }

    /// Clear the write log.
    pub fn clear_write_log(&mut self) {
        self.state.lock().write_log.clear();
    }

    /// Hand out at most `limit` bytes per read call.
    pub fn set_max_read_chunk(&mut self, limit: Option<usize>) {
        self.state.lock().max_read_chunk = limit;
    }

    /// Accept at most `limit` bytes per write call.
    pub fn set_max_write_chunk(&mut self, limit: Option<usize>) {
        self.state.lock().max_write_chunk = limit;
    }

    /// Make the next read fail with an I/O error of the given kind.
    pub fn fail_next_read(&mut self, kind: std::io::ErrorKind) {
        self.state.lock().pending_read_errors.push_back(kind);
    }

    /// Simulate closing the underlying endpoint.
    pub fn close(&mut self) {
        self.state.lock().open = false;
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// Number of `read_bytes` calls made while open.
    pub fn read_calls(&self) -> usize {
        self.state.lock().read_calls
    }
}

impl SerialTransport for MockSerialPort {
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if !state.open {
            return Ok(0);
        }
        state.read_calls += 1;

        if let Some(kind) = state.pending_read_errors.pop_front() {
            return Err(PortError::Io(std::io::Error::new(kind, "injected read error")));
        }

        let limit = state.max_read_chunk.unwrap_or(usize::MAX).min(buffer.len());
        let count = limit.min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if !state.open {
            return Ok(0);
        }

        let accepted = state.max_write_chunk.unwrap_or(usize::MAX).min(data.len());
        let chunk = &data[..accepted];
        state.write_log.push(chunk.to_vec());
        if state.loopback {
            state.read_queue.extend(chunk);
        }
        Ok(accepted)
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
