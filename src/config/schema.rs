//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::port::{Direction, LineSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which device to open and how
    pub port: PortConfig,
    /// Line settings applied after open
    pub line: LineSettings,
    /// Loopback self-test parameters
    pub selftest: SelfTestConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.port.receive && !self.port.transmit {
            return Err(ConfigError::validation(
                "port.receive/port.transmit",
                "at least one direction must be enabled",
            ));
        }
        if matches!(self.port.path.as_deref(), Some("")) {
            return Err(ConfigError::validation("port.path", "must not be empty"));
        }
        Ok(())
    }
}

/// Device section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    /// Device path, e.g. /dev/ttyUSB0
    pub path: Option<String>,
    /// Open for reading
    pub receive: bool,
    /// Open for writing
    pub transmit: bool,
    /// Port aliases for convenience
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            path: None,
            receive: true,
            transmit: true,
            aliases: HashMap::new(),
        }
    }
}

impl PortConfig {
    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// The configured direction, if any is enabled.
    pub fn direction(&self) -> Option<Direction> {
        Direction::from_flags(self.receive, self.transmit)
    }
}

/// Loopback self-test section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfTestConfig {
    /// Text written and expected back
    pub message: String,
    /// Give up reading after this many milliseconds; 0 waits forever
    pub timeout_ms: u64,
}

impl Default for SelfTestConfig {
    fn default() -> Self {
        Self {
            message: "The big brown fox jumps over the lazy dog 01234567890.".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl SelfTestConfig {
    /// The read timeout, or `None` to block indefinitely.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "pretty" or "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line format with colors
    Pretty,
    /// Single-line format
    #[default]
    Compact,
}
