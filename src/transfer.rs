//! Blocking buffer, text and delimiter transfers.
//!
//! Everything here is written against [`SerialTransport`], so the same calls
//! work on a [`PortHandle`](crate::PortHandle) and on a
//! [`MockSerialPort`](crate::MockSerialPort).
//!
//! Only [`read_text`](BlockingTransfer::read_text) and
//! [`read_until`](BlockingTransfer::read_until) loop. Both block for as long
//! as the transport keeps delivering nothing; the `_within` variants put a
//! deadline on that, checked between reads.

use crate::port::{PortError, SerialTransport};
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

/// Blocking transfers layered on the single-shot transport primitives.
///
/// Implemented for every [`SerialTransport`].
pub trait BlockingTransfer: SerialTransport {
    /// One read of at most `requested` bytes.
    ///
    /// The returned buffer holds only the bytes actually delivered, which
    /// may be fewer than requested.
    fn read_buffer(&mut self, requested: usize) -> Result<Vec<u8>, PortError> {
        let mut buffer = vec![0u8; requested];
        let n = self.read_bytes(&mut buffer)?;
        buffer.truncate(n);
        Ok(buffer)
    }

    /// One write of the whole buffer. Partial writes are returned as-is.
    fn write_buffer(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.write_bytes(data)
    }

    /// Write the UTF-8 bytes of `text` with a single write.
    fn write_text(&mut self, text: &str) -> Result<usize, PortError> {
        self.write_buffer(text.as_bytes())
    }

    /// Read exactly `requested` bytes and decode them as UTF-8.
    ///
    /// Keeps reading until the byte count is reached. If the stream turns out
    /// not to be valid UTF-8 the text decoded up to that point is returned.
    /// A transport that is not open yields whatever has been read so far.
    fn read_text(&mut self, requested: usize) -> Result<String, PortError> {
        read_text_until(self, requested, Deadline::none())
    }

    /// [`read_text`](Self::read_text) with a deadline.
    ///
    /// Fails with [`PortError::Timeout`] if `timeout` passes before
    /// `requested` bytes arrive.
    fn read_text_within(&mut self, requested: usize, timeout: Duration) -> Result<String, PortError> {
        read_text_until(self, requested, Deadline::after(timeout))
    }

    /// Read one byte at a time until `delimiter`.
    ///
    /// The delimiter is consumed but not returned; bytes after it stay
    /// unread. There is no length limit. A line that is not valid UTF-8 is
    /// decoded one char per byte, so no byte is dropped.
    fn read_until(&mut self, delimiter: u8) -> Result<String, PortError> {
        read_until_deadline(self, delimiter, Deadline::none())
    }

    /// [`read_until`](Self::read_until) with a deadline.
    fn read_until_within(&mut self, delimiter: u8, timeout: Duration) -> Result<String, PortError> {
        read_until_deadline(self, delimiter, Deadline::after(timeout))
    }

    /// Read up to the next line feed.
    fn read_line(&mut self) -> Result<String, PortError> {
        self.read_until(b'\n')
    }
}

impl<T: SerialTransport + ?Sized> BlockingTransfer for T {}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    limit: Option<(Instant, Duration)>,
}

impl Deadline {
    fn none() -> Self {
        Self { limit: None }
    }

    /// A deadline too far out to represent never fires.
    fn after(timeout: Duration) -> Self {
        Self {
            limit: Instant::now().checked_add(timeout).map(|at| (at, timeout)),
        }
    }

    fn check(&self) -> Result<(), PortError> {
        match self.limit {
            Some((at, timeout)) if Instant::now() >= at => Err(PortError::timeout(timeout)),
            _ => Ok(()),
        }
    }
}

/// Incremental UTF-8 decoder.
///
/// A multi-byte sequence split across chunks is held back until the rest
/// arrives; an invalid sequence ends decoding.
#[derive(Debug, Default)]
struct Utf8Accumulator {
    text: String,
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    /// Append a chunk. Returns `false` once invalid UTF-8 has been seen.
    fn push(&mut self, chunk: &[u8]) -> bool {
        self.pending.extend_from_slice(chunk);
        match std::str::from_utf8(&self.pending) {
            Ok(decoded) => {
                self.text.push_str(decoded);
                self.pending.clear();
                true
            }
            Err(err) => {
                let valid = err.valid_up_to();
                if let Ok(prefix) = std::str::from_utf8(&self.pending[..valid]) {
                    self.text.push_str(prefix);
                }
                match err.error_len() {
                    // Incomplete sequence at the end: wait for more bytes.
                    None => {
                        self.pending.drain(..valid);
                        true
                    }
                    Some(_) => {
                        self.pending.clear();
                        false
                    }
                }
            }
        }
    }

    fn finish(self) -> String {
        self.text
    }
}

fn is_interrupted(err: &PortError) -> bool {
    matches!(err, PortError::Io(e) if e.kind() == io::ErrorKind::Interrupted)
}

fn read_text_until<T: SerialTransport + ?Sized>(
    port: &mut T,
    requested: usize,
    deadline: Deadline,
) -> Result<String, PortError> {
    let mut decoder = Utf8Accumulator::default();
    let mut read_so_far = 0;

    while read_so_far < requested {
        if !port.is_open() {
            debug!("{} closed after {} of {} bytes", port.name(), read_so_far, requested);
            break;
        }
        match port.read_buffer(requested - read_so_far) {
            Ok(chunk) => {
                read_so_far += chunk.len();
                if !decoder.push(&chunk) {
                    debug!(
                        "Invalid UTF-8 from {} after {} bytes, returning partial text",
                        port.name(),
                        read_so_far
                    );
                    break;
                }
            }
            Err(e) if is_interrupted(&e) => {}
            Err(e) => return Err(e),
        }
        if read_so_far < requested {
            deadline.check()?;
        }
    }

    Ok(decoder.finish())
}

fn read_until_deadline<T: SerialTransport + ?Sized>(
    port: &mut T,
    delimiter: u8,
    deadline: Deadline,
) -> Result<String, PortError> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    while port.is_open() {
        match port.read_bytes(&mut byte) {
            Ok(0) => {}
            Ok(_) if byte[0] == delimiter => break,
            Ok(_) => line.push(byte[0]),
            Err(e) if is_interrupted(&e) => {}
            Err(e) => return Err(e),
        }
        deadline.check()?;
    }

    Ok(decode_line(line, port.name()))
}

/// UTF-8 when the whole line is valid, otherwise one char per byte.
fn decode_line(line: Vec<u8>, name: &str) -> String {
    String::from_utf8(line).unwrap_or_else(|err| {
        debug!("Line from {} is not UTF-8, decoding byte by byte", name);
        err.into_bytes().into_iter().map(char::from).collect()
    })
}
