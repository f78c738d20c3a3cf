//! Port abstraction layer for serial communication.
//!
//! Provides the device handle, its line settings, and the transport trait the
//! transfer layer is written against, plus a mock for tests.

pub mod error;
pub mod handle;
pub mod mock;
pub mod settings;
pub mod traits;

pub use error::PortError;
pub use handle::{ClearBuffer, Direction, PortHandle, SERIAL_OPEN_FAIL};
pub use mock::MockSerialPort;
pub use settings::{BaudRate, DataBits, LineSettings, Parity, StopBits};
pub use traits::*;
