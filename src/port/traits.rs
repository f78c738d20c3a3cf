//! Core trait for the raw transport under the transfer layer.
//!
//! Defines the `SerialTransport` trait that allows both real device handles
//! and mock implementations to be used interchangeably.

use super::error::PortError;

/// Single-shot byte transfer against an open (or closed) serial endpoint.
///
/// Implementations never loop: one call maps to at most one OS-level read or
/// write. A transport that is not open reports `Ok(0)` from both primitives
/// and leaves the caller's buffer untouched.
pub trait SerialTransport: std::fmt::Debug {
    /// Read whatever the endpoint delivers into `buffer`.
    ///
    /// Returns the number of bytes actually read, which may be less than
    /// `buffer.len()`. How long this blocks is governed by the VMIN/VTIME
    /// values of the active line settings.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Write bytes to the endpoint.
    ///
    /// Returns the number of bytes actually accepted. Partial writes are not
    /// retried.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Whether the transport currently owns an open endpoint.
    fn is_open(&self) -> bool;

    /// Get the name/path of this endpoint.
    fn name(&self) -> &str;
}

impl<T: SerialTransport + ?Sized> SerialTransport for Box<T> {
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        (**self).read_bytes(buffer)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        (**self).write_bytes(data)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
