//! Configuration module for linux-serial.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `LINUX_SERIAL_CONFIG` environment variable (explicit path)
//! 2. `./linux-serial.toml` (current directory)
//! 3. `~/.config/linux-serial/config.toml` (XDG)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `LINUX_SERIAL_<SECTION>_<KEY>`
//!
//! Examples:
//! - `LINUX_SERIAL_PORT_PATH=/dev/ttyUSB0`
//! - `LINUX_SERIAL_LINE_BAUD=115200`
//! - `LINUX_SERIAL_LINE_VMIN=0`, `LINUX_SERIAL_LINE_VTIME=10`
//!
//! Legacy environment variables are also supported:
//! - `TEST_PORT`, `TEST_BAUD`, `TEST_TIMEOUT`
//!
//! # Example
//!
//! ```toml
//! [port]
//! path = "/dev/ttyUSB0"
//!
//! [line]
//! receive_baud = 115200
//! transmit_baud = 115200
//! data_bits = 8
//! stop_bits = 1
//! parity = "none"
//! min_chars = 1
//! min_wait_tenths = 0
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, PortConfig, SelfTestConfig};
