//! Linux Serial Library
//!
//! Blocking access to serial (UART) devices through the Linux termios
//! interface: open a device node, apply line settings, and move bytes, buffers
//! and text lines with blocking calls.
//!
//! # Modules
//!
//! - `port`: device handle, line settings and the raw transport trait
//! - `transfer`: blocking buffer, text and delimiter reads built on a transport
//! - `config`: configuration management with TOML support
//! - `error`: application-level error type used by the loopback binary
//!
//! # Example
//!
//! ```no_run
//! use linux_serial::{BlockingTransfer, LineSettings, PortHandle};
//!
//! let mut port = PortHandle::new("/dev/ttyUSB0");
//! port.open(true, true)?;
//! port.apply_settings(&LineSettings::default())?;
//!
//! port.write_text("ping\n")?;
//! let reply = port.read_line()?;
//! println!("device said: {reply}");
//!
//! port.close();
//! # Ok::<(), linux_serial::PortError>(())
//! ```

#[cfg(not(target_os = "linux"))]
compile_error!("linux_serial drives the Linux termios interface and only builds for target_os = \"linux\"");

pub mod config;
pub mod error;
pub mod port;
pub mod transfer;

// Re-export commonly used types for convenience
pub use error::AppError;
pub use port::{
    BaudRate, ClearBuffer, DataBits, Direction, LineSettings, MockSerialPort, Parity, PortError,
    PortHandle, SerialTransport, StopBits, SERIAL_OPEN_FAIL,
};
pub use transfer::BlockingTransfer;

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
