//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use crate::port::BaudRate;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "LINUX_SERIAL";

/// Config file name looked up in the current directory
const LOCAL_CONFIG_FILE_NAME: &str = "linux-serial.toml";

/// Config file name inside the application config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name under the platform config directory
const APP_DIR_NAME: &str = "linux-serial";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "LINUX_SERIAL_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `LINUX_SERIAL_CONFIG` environment variable (explicit path)
    /// 2. `./linux-serial.toml` (current directory)
    /// 3. `$XDG_CONFIG_HOME/linux-serial/config.toml` (or `~/.config/...`)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        if apply_env_overrides(&mut config).is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to file.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRequired("No config file path set".to_string()))?;

        save_to_file(&self.config, path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }

    /// Reload configuration from file (if path is set).
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(ref path) = self.config_path {
            let mut config = load_from_file(path)?;
            apply_env_overrides(&mut config)?;
            config.validate()?;
            self.config = config;
        }
        Ok(())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

fn get_config_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read `primary`, falling back to a legacy variable name.
fn env_var(primary: &str, legacy: Option<&str>) -> Option<(String, String)> {
    std::env::var(primary)
        .ok()
        .map(|v| (primary.to_string(), v))
        .or_else(|| {
            legacy.and_then(|name| std::env::var(name).ok().map(|v| (name.to_string(), v)))
        })
}

fn parse_env<T: FromStr>(var: &str, value: &str, what: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(var, format!("Invalid {what}: {value}")))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `LINUX_SERIAL_<SECTION>_<KEY>`
/// For example:
/// - `LINUX_SERIAL_PORT_PATH=/dev/ttyUSB0`
/// - `LINUX_SERIAL_LINE_BAUD=115200`
/// - `LINUX_SERIAL_LOG_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Port overrides (also support legacy TEST_PORT)
    if let Some((_, val)) = env_var(&format!("{}_PORT_PATH", ENV_PREFIX), Some("TEST_PORT")) {
        config.port.path = Some(val);
    }

    // Line overrides
    if let Some((var, val)) = env_var(&format!("{}_LINE_BAUD", ENV_PREFIX), Some("TEST_BAUD")) {
        let bps: u32 = parse_env(&var, &val, "baud rate")?;
        let baud = BaudRate::from_bits_per_second(bps)
            .ok_or_else(|| ConfigError::env_parse(&var, format!("Unsupported baud rate: {bps}")))?;
        config.line.receive_baud = baud;
        config.line.transmit_baud = baud;
    }
    if let Some((var, val)) = env_var(&format!("{}_LINE_VMIN", ENV_PREFIX), None) {
        config.line.min_chars = parse_env(&var, &val, "VMIN (0-255)")?;
    }
    if let Some((var, val)) = env_var(&format!("{}_LINE_VTIME", ENV_PREFIX), None) {
        config.line.min_wait_tenths = parse_env(&var, &val, "VTIME (0-255)")?;
    }

    // Self-test overrides
    if let Some((var, val)) = env_var(
        &format!("{}_SELFTEST_TIMEOUT_MS", ENV_PREFIX),
        Some("TEST_TIMEOUT"),
    ) {
        config.selftest.timeout_ms = parse_env(&var, &val, "timeout")?;
    }

    // Logging overrides
    if let Some((_, val)) = env_var(&format!("{}_LOG_LEVEL", ENV_PREFIX), None) {
        config.logging.level = val;
    }

    Ok(())
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR_NAME))
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().line.receive_baud, BaudRate::B9600);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("LINUX_SERIAL_LINE_BAUD", "115200");
        env::set_var("LINUX_SERIAL_LINE_VTIME", "20");

        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().line.receive_baud, BaudRate::B115200);
        assert_eq!(loader.config().line.transmit_baud, BaudRate::B115200);
        assert_eq!(loader.config().line.min_wait_tenths, 20);

        env::remove_var("LINUX_SERIAL_LINE_BAUD");
        env::remove_var("LINUX_SERIAL_LINE_VTIME");
    }

    #[test]
    #[serial]
    fn test_legacy_test_port_env() {
        env::set_var("TEST_PORT", "/dev/ttyUSB7");
        env::set_var("TEST_BAUD", "57600");

        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().port.path.as_deref(), Some("/dev/ttyUSB7"));
        assert_eq!(loader.config().line.receive_baud, BaudRate::B57600);

        env::remove_var("TEST_PORT");
        env::remove_var("TEST_BAUD");
    }

    #[test]
    #[serial]
    fn test_unsupported_env_baud_is_rejected() {
        env::set_var("LINUX_SERIAL_LINE_BAUD", "12345");

        let mut config = Config::default();
        let result = apply_env_overrides(&mut config);
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));

        env::remove_var("LINUX_SERIAL_LINE_BAUD");
    }

    #[test]
    #[serial]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("linux-serial.toml");

        let mut loader = ConfigLoader::with_defaults();
        loader.config_mut().port.path = Some("/dev/ttyAMA0".to_string());
        loader.config_mut().line.min_chars = 0;
        loader.save_to(&path).unwrap();

        let loaded = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loaded.config(), loader.config());
        assert_eq!(loaded.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    #[serial]
    fn test_save_requires_a_path() {
        let loader = ConfigLoader::with_defaults();
        assert!(matches!(loader.save(), Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    #[serial]
    fn test_save_then_reload_picks_up_file_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linux-serial.toml");
        std::fs::write(&path, "[port]\npath = \"/dev/ttyUSB0\"\n").unwrap();

        let mut loader = ConfigLoader::load_from(&path).unwrap();
        loader.config_mut().line.min_wait_tenths = 5;
        loader.save().unwrap();

        let saved = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(saved.config().line.min_wait_tenths, 5);
        assert_eq!(saved.config().port.path.as_deref(), Some("/dev/ttyUSB0"));

        std::fs::write(&path, "[line]\nreceive_baud = 38400\n").unwrap();
        loader.reload().unwrap();
        assert_eq!(loader.config().line.receive_baud, BaudRate::B38400);
        assert_eq!(loader.config().line.min_wait_tenths, 0);
        assert_eq!(loader.config().port.path, None);
    }

    #[test]
    #[serial]
    fn test_reload_without_path_keeps_config() {
        let mut loader = ConfigLoader::with_defaults();
        loader.config_mut().line.min_chars = 9;
        loader.reload().unwrap();
        assert_eq!(loader.config().line.min_chars, 9);
    }

    #[test]
    #[serial]
    fn test_explicit_config_path_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[port]\npath = \"/dev/ttyS3\"\n").unwrap();
        env::set_var(CONFIG_PATH_ENV, &path);

        let loader = ConfigLoader::load().unwrap();
        assert_eq!(loader.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(loader.config().port.path.as_deref(), Some("/dev/ttyS3"));

        env::remove_var(CONFIG_PATH_ENV);
    }

    #[test]
    #[serial]
    fn test_invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[line]\ndata_bits = 9\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
