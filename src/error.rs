use crate::config::ConfigError;
use crate::port::PortError;
use thiserror::Error;

/// Unified application error type for the loopback binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// No device path on the command line, in the config file, or in the environment.
    #[error("No serial port given; pass one as the first argument (e.g. /dev/ttyUSB0) or set LINUX_SERIAL_PORT_PATH")]
    MissingPort,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Port(#[from] PortError),
}
