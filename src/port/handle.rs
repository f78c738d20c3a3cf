//! Device handle owning one open serial file descriptor.
//!
//! Wraps a `std::fs::File` opened with `O_NOCTTY` and implements
//! `SerialTransport` on top of it, so the transfer layer can drive a real
//! device or a mock through the same calls.

use super::error::PortError;
use super::settings::LineSettings;
use super::traits::SerialTransport;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use tracing::{debug, trace, warn};

/// Descriptor value reported by [`PortHandle::raw_fd`] while the handle is not open.
pub const SERIAL_OPEN_FAIL: RawFd = -1;

/// Which transfer directions a handle was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Receive,
    Transmit,
    Both,
}

impl Direction {
    /// Combine receive/transmit flags; `None` when neither is requested.
    pub fn from_flags(receive: bool, transmit: bool) -> Option<Self> {
        match (receive, transmit) {
            (true, true) => Some(Direction::Both),
            (true, false) => Some(Direction::Receive),
            (false, true) => Some(Direction::Transmit),
            (false, false) => None,
        }
    }

    pub fn can_receive(self) -> bool {
        matches!(self, Direction::Receive | Direction::Both)
    }

    pub fn can_transmit(self) -> bool {
        matches!(self, Direction::Transmit | Direction::Both)
    }
}

/// Queue selection for [`PortHandle::clear_buffers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearBuffer {
    /// Data received but not yet read.
    Input,
    /// Data written but not yet transmitted.
    Output,
    All,
}

impl ClearBuffer {
    fn queue_selector(self) -> libc::c_int {
        match self {
            ClearBuffer::Input => libc::TCIFLUSH,
            ClearBuffer::Output => libc::TCOFLUSH,
            ClearBuffer::All => libc::TCIOFLUSH,
        }
    }
}

/// A serial device bound to a path, open or not.
///
/// The handle owns at most one descriptor. `close` and `Drop` both release
/// it; closing twice is harmless.
pub struct PortHandle {
    /// The device path this handle is bound to.
    path: String,
    /// The open device, if any.
    file: Option<File>,
    /// Directions requested at open time.
    direction: Option<Direction>,
}

impl PortHandle {
    /// Bind a new, unopened handle to `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file: None,
            direction: None,
        }
    }

    /// Open the device for the requested directions.
    ///
    /// The device is opened with `O_NOCTTY`, so it never becomes the
    /// controlling terminal of the process. Returns the raw descriptor on
    /// success; nothing is held on failure.
    ///
    /// # Example
    /// ```no_run
    /// use linux_serial::{PortHandle, SerialTransport};
    ///
    /// let mut port = PortHandle::new("/dev/ttyUSB0");
    /// let fd = port.open(true, true)?;
    /// assert!(port.is_open());
    /// # let _ = fd;
    /// # Ok::<(), linux_serial::PortError>(())
    /// ```
    pub fn open(&mut self, receive: bool, transmit: bool) -> Result<RawFd, PortError> {
        if self.path.is_empty() {
            return Err(PortError::config("device path is empty"));
        }
        let direction = Direction::from_flags(receive, transmit)
            .ok_or_else(|| PortError::config("neither receive nor transmit requested"))?;
        if self.file.is_some() {
            return Err(PortError::AlreadyOpen);
        }

        let file = OpenOptions::new()
            .read(direction.can_receive())
            .write(direction.can_transmit())
            .custom_flags(libc::O_NOCTTY)
            .open(&self.path)
            .map_err(|e| {
                warn!("Failed to open {}: {}", self.path, e);
                PortError::from_open(&self.path, e)
            })?;

        let fd = file.as_raw_fd();
        debug!("Opened {} as fd {} ({:?})", self.path, fd, direction);
        self.file = Some(file);
        self.direction = Some(direction);
        Ok(fd)
    }

    /// Open `path` for `direction` and apply `settings` in one step.
    pub fn open_with(
        path: impl Into<String>,
        direction: Direction,
        settings: &LineSettings,
    ) -> Result<Self, PortError> {
        let mut handle = Self::new(path);
        handle.open(direction.can_receive(), direction.can_transmit())?;
        handle.apply_settings(settings)?;
        Ok(handle)
    }

    /// The device path this handle is bound to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Directions the handle was opened with, or `None` while closed.
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// The open descriptor, or [`SERIAL_OPEN_FAIL`] while closed.
    pub fn raw_fd(&self) -> RawFd {
        self.file.as_ref().map_or(SERIAL_OPEN_FAIL, |f| f.as_raw_fd())
    }

    /// Apply line settings immediately (`TCSANOW`).
    ///
    /// Starts from the device's current attributes, so anything
    /// `LineSettings` does not manage is preserved. A closed handle is left
    /// alone and `Ok(())` is returned. Failures of `tcgetattr`/`tcsetattr`
    /// are reported.
    pub fn apply_settings(&mut self, settings: &LineSettings) -> Result<(), PortError> {
        let Some(file) = self.file.as_ref() else {
            return Ok(());
        };
        let fd = file.as_raw_fd();

        let mut termios = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: `fd` is owned by `file` and open; `termios` is a valid out-pointer.
        if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
            let err = io::Error::last_os_error();
            warn!("tcgetattr failed on {}: {}", self.path, err);
            return Err(PortError::Io(err));
        }
        // SAFETY: tcgetattr succeeded and filled the structure.
        let mut termios = unsafe { termios.assume_init() };

        settings.apply_to(&mut termios)?;

        // SAFETY: `fd` is open and `termios` is fully initialised.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
            let err = io::Error::last_os_error();
            warn!("tcsetattr failed on {}: {}", self.path, err);
            return Err(PortError::Io(err));
        }

        debug!(
            "Applied {}/{} baud, {} data bits, {} stop bits, parity {:?} to {}",
            settings.receive_baud,
            settings.transmit_baud,
            settings.data_bits.bits(),
            settings.stop_bits.bits(),
            settings.parity,
            self.path
        );
        Ok(())
    }

    /// Discard queued input and/or output.
    pub fn clear_buffers(&mut self, which: ClearBuffer) -> Result<(), PortError> {
        let Some(file) = self.file.as_ref() else {
            return Ok(());
        };
        // SAFETY: the descriptor is open for the lifetime of `file`.
        if unsafe { libc::tcflush(file.as_raw_fd(), which.queue_selector()) } != 0 {
            return Err(PortError::Io(io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Block until all queued output has been transmitted.
    pub fn drain(&mut self) -> Result<(), PortError> {
        let Some(file) = self.file.as_ref() else {
            return Ok(());
        };
        loop {
            // SAFETY: the descriptor is open for the lifetime of `file`.
            if unsafe { libc::tcdrain(file.as_raw_fd()) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(PortError::Io(err));
            }
        }
    }

    /// Release the descriptor. Does nothing if already closed.
    pub fn close(&mut self) {
        if let Some(file) = self.file.take() {
            debug!("Closing {} (fd {})", self.path, file.as_raw_fd());
            self.direction = None;
            drop(file);
        }
    }
}

impl SerialTransport for PortHandle {
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };
        let n = file.read(buffer)?;
        trace!("Read {} of {} bytes from {}", n, buffer.len(), self.path);
        Ok(n)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };
        let n = file.write(data)?;
        trace!("Wrote {} of {} bytes to {}", n, data.len(), self.path);
        Ok(n)
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn name(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for PortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortHandle")
            .field("path", &self.path)
            .field("fd", &self.raw_fd())
            .field("direction", &self.direction)
            .finish()
    }
}
