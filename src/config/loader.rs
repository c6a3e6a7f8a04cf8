//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "USB_SERIAL";

/// Config file name
const CONFIG_FILE_NAME: &str = "usb-serial.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "USB_SERIAL_CONFIG";

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
    /// 1. `USB_SERIAL_CONFIG` environment variable (explicit path)
    /// 2. `./usb-serial.toml` (current directory)
    /// 3. `usb-serial.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
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
        if apply_env_overrides(&mut config).is_err() || config.validate().is_err() {
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

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|p| p.exists())
}

/// Get the platform config directory for this tool.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "usb-serial").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
    toml::from_str(&content).map_err(|e| ConfigError::parse(path, e))
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::write(path, e))?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write(path, e))
}

fn env_override<T: FromStr>(key: &str, expected: &'static str) -> ConfigResult<Option<T>> {
    let var = format!("{ENV_PREFIX}_{key}");
    let Ok(value) = std::env::var(&var) else {
        return Ok(None);
    };
    match value.trim().parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::Env {
            var,
            value,
            expected,
        }),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `USB_SERIAL_<SECTION>_<KEY>`
/// For example:
/// - `USB_SERIAL_SERIAL_BAUD_RATE=9600`
/// - `USB_SERIAL_SERIAL_READ_TIMEOUT_MS=250`
/// - `USB_SERIAL_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some(val) = env_override("SERIAL_BAUD_RATE", "baud rate")? {
        config.serial.baud_rate = val;
    }
    if let Some(val) = env_override("SERIAL_READ_TIMEOUT_MS", "timeout")? {
        config.serial.read_timeout_ms = val;
    }
    if let Some(val) = env_override("SERIAL_MAX_PACKET_LEN", "packet length")? {
        config.serial.max_packet_len = val;
    }
    if let Some(val) = env_override::<String>("LOGGING_LEVEL", "log level")? {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_LOGGING_FORMAT")) {
        config.logging.format = val.parse()?;
    }

    Ok(())
}
