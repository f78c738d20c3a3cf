//! Shared test utilities for linux_serial integration tests.
//!
//! This module provides:
//! - Pseudo-terminal pairs standing in for a real serial device
//! - An echo thread turning a pty into a TX-RX loopback
//! - Termios inspection helpers

#![allow(dead_code)]

use linux_serial::port::MockSerialPort;
use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A pseudo-terminal: the master side stays in the test, the slave path is
/// what the code under test opens as its "serial device".
pub struct PtyPair {
    pub master: File,
    pub slave_path: String,
    /// Keeps the slave open so master reads never see a hang-up while the
    /// handle under test is between open and close.
    held_slave: Option<File>,
}

impl PtyPair {
    pub fn open() -> io::Result<Self> {
        // SAFETY: plain libc calls on a descriptor we own; the name buffer is
        // NUL-terminated by ptsname_r on success.
        unsafe {
            let fd = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }
            let master = File::from_raw_fd(fd);
            if libc::grantpt(fd) != 0 || libc::unlockpt(fd) != 0 {
                return Err(io::Error::last_os_error());
            }

            let mut name = [0 as libc::c_char; 128];
            let rc = libc::ptsname_r(fd, name.as_mut_ptr(), name.len());
            if rc != 0 {
                return Err(io::Error::from_raw_os_error(rc));
            }
            let slave_path = CStr::from_ptr(name.as_ptr()).to_string_lossy().into_owned();

            let held_slave = OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(libc::O_NOCTTY)
                .open(&slave_path)?;

            Ok(Self {
                master,
                slave_path,
                held_slave: Some(held_slave),
            })
        }
    }

    /// Write bytes into the device as if they arrived on its RX line.
    pub fn send(&mut self, data: &[u8]) {
        self.master.write_all(data).expect("write to pty master");
        self.master.flush().expect("flush pty master");
    }

    /// Read what the device transmitted, waiting up to `timeout` for `expected` bytes.
    pub fn receive(&mut self, expected: usize, timeout: Duration) -> Vec<u8> {
        set_nonblocking(self.master.as_raw_fd(), true);
        let deadline = Instant::now() + timeout;
        let mut collected = Vec::new();
        let mut buf = [0u8; 256];
        while collected.len() < expected && Instant::now() < deadline {
            match self.master.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => collected.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5))
                }
                Err(_) => break,
            }
        }
        set_nonblocking(self.master.as_raw_fd(), false);
        collected
    }

    /// Echo everything the device transmits straight back to its RX line.
    pub fn spawn_echo(&self) -> JoinHandle<()> {
        let mut master = self.master.try_clone().expect("clone pty master");
        thread::spawn(move || {
            let mut buf = [0u8; 256];
            loop {
                match master.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if master.write_all(&buf[..n]).is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Drop the helper's own slave descriptor so the master sees a hang-up
    /// once the code under test closes its handle.
    pub fn release_slave(&mut self) {
        self.held_slave = None;
    }
}

fn set_nonblocking(fd: RawFd, enabled: bool) {
    // SAFETY: fcntl on an open descriptor owned by the caller.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        let flags = if enabled {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        libc::fcntl(fd, libc::F_SETFL, flags);
    }
}

/// Fetch the current termios of an open descriptor.
pub fn current_termios(fd: RawFd) -> libc::termios {
    // SAFETY: all-zero is a valid termios and tcgetattr overwrites it.
    let mut termios: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: `fd` is open and `termios` is a valid out-pointer.
    let rc = unsafe { libc::tcgetattr(fd, &mut termios) };
    assert_eq!(rc, 0, "tcgetattr failed: {}", io::Error::last_os_error());
    termios
}

/// Create a mock serial port with pre-programmed responses.
pub fn create_mock_port_with_responses(port_name: &str, responses: Vec<&[u8]>) -> MockSerialPort {
    let mut mock = MockSerialPort::new(port_name);
    for response in responses {
        mock.enqueue_read(response);
    }
    mock
}
