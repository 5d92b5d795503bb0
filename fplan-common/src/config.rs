//! Configuration loading
//!
//! Each setting resolves in priority order:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in default
//!
//! The first two are handled by clap (`#[arg(env = ...)]`) in each binary and
//! arrive here as a single `Option`.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default interval between polls of the feed / hand-off endpoint
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Default timeout for a single HTTP request
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 1000;

/// Optional TOML bootstrap file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite store
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse config from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load the explicitly requested file, else the platform default file if
    /// it exists, else built-in defaults.
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// file is not.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Database path: CLI/env value, then TOML, then platform default
    pub fn database_path(&self, cli_or_env: Option<&Path>) -> PathBuf {
        cli_or_env
            .map(Path::to_path_buf)
            .or_else(|| self.database_path.clone())
            .unwrap_or_else(default_database_path)
    }

    pub fn poll_interval(&self, cli_or_env: Option<u64>) -> Duration {
        Duration::from_millis(
            cli_or_env
                .or(self.poll_interval_ms)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    pub fn request_timeout(&self, cli_or_env: Option<u64>) -> Duration {
        Duration::from_millis(
            cli_or_env
                .or(self.request_timeout_ms)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }
}

/// `<config_dir>/fplan/config.toml`, or `/etc/fplan/config.toml` on Linux
/// when no user file exists
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("fplan").join("config.toml"));

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/fplan/config.toml");
        match user_config {
            Some(path) if path.exists() => Some(path),
            _ if system_config.exists() => Some(system_config),
            other => other,
        }
    } else {
        user_config
    }
}

/// OS-dependent default location of the store
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fplan"))
        .unwrap_or_else(|| PathBuf::from("./fplan_data"))
        .join("fplan.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::parse("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.poll_interval(None),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
        );
        assert_eq!(
            config.request_timeout(None),
            Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)
        );
        assert_eq!(config.database_path(None), default_database_path());
    }

    #[test]
    fn test_cli_value_beats_toml() {
        let config = TomlConfig::parse(
            r#"
            database_path = "/srv/fplan/flights.db"
            poll_interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.poll_interval(None), Duration::from_millis(500));
        assert_eq!(config.poll_interval(Some(50)), Duration::from_millis(50));
        assert_eq!(
            config.database_path(None),
            PathBuf::from("/srv/fplan/flights.db")
        );
        assert_eq!(
            config.database_path(Some(Path::new("/tmp/other.db"))),
            PathBuf::from("/tmp/other.db")
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::parse("poll_interval_ms = \"fast\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_default_database_path_file_name() {
        assert!(default_database_path().ends_with("fplan/fplan.db"));
    }
}
