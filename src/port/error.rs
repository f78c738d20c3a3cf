//! Port-specific error types.
//!
//! Defines error types for serial port operations, separate from application-level
//! errors to maintain clean separation of concerns.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified device node does not exist.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// The process may not open the device node.
    #[error("Permission denied opening {0} (root or dialout group membership may be required)")]
    PermissionDenied(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The open request itself was invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Attempted to open a port that's already open.
    #[error("Port is already open")]
    AlreadyOpen,
}

impl PortError {
    /// Create a NotFound error from a device path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Classify an error returned by `open(2)` for the given path.
    pub(crate) fn from_open(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_string()),
            _ => Self::Io(err),
        }
    }
}
