//! Configuration management for the application.
//!
//! This module handles loading and saving application configuration in TOML
//! format with platform-specific directory resolution.

use crate::constants::{APP_NAME, DEFAULT_AUTOSAVE_DELAY_MS, DEFAULT_HISTORY_LIMIT};
use crate::models::Breakpoint;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that replaces the platform config directory.
pub const CONFIG_DIR_ENV: &str = "PAGESTUDIO_CONFIG_DIR";

/// Default HTTP bind address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3002;

/// Path configuration for file system locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Directory holding page documents (`<id>.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    /// Directory holding plugin manifests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PathBuf>,
}

/// Editor session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Debounce delay before unsaved edits are flushed
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,
    /// Number of undo snapshots kept
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Breakpoint a new session starts on
    #[serde(default)]
    pub default_breakpoint: Breakpoint,
}

const fn default_autosave_delay_ms() -> u64 {
    DEFAULT_AUTOSAVE_DELAY_MS
}

const fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            default_breakpoint: Breakpoint::default(),
        }
    }
}

impl StudioConfig {
    /// The autosave delay as a [`Duration`].
    #[must_use]
    pub const fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
        }
    }
}

/// Application configuration.
///
/// # File Location
///
/// - Linux: `~/.config/PageStudio/config.toml`
/// - macOS: `~/Library/Application Support/PageStudio/config.toml`
/// - Windows: `%APPDATA%\PageStudio\config.toml`
///
/// `PAGESTUDIO_CONFIG_DIR` replaces the directory on every platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// File system paths
    #[serde(default)]
    pub paths: PathConfig,
    /// Editor session settings
    #[serde(default)]
    pub studio: StudioConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Creates a new Config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the config directory path.
    ///
    /// # Errors
    ///
    /// Returns an error if no platform config directory is known and
    /// `PAGESTUDIO_CONFIG_DIR` is unset.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(APP_NAME);

        Ok(config_dir)
    }

    /// Gets the full path to the config file.
    ///
    /// # Errors
    ///
    /// See [`Self::config_dir`].
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the config file.
    ///
    /// If the file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Loads configuration from `path`, defaulting when it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .context(format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to the config file using atomic write.
    ///
    /// # Errors
    ///
    /// Returns an error if validation, serialization or the write fails.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Saves configuration to `path` (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if validation, serialization or the write fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(config_dir) = path.parent() {
            fs::create_dir_all(config_dir).context(format!(
                "Failed to create config directory: {}",
                config_dir.display()
            ))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        let temp_path = path.with_extension("toml.tmp");

        fs::write(&temp_path, content).context(format!(
            "Failed to write temp config file: {}",
            temp_path.display()
        ))?;

        fs::rename(&temp_path, path).context(format!(
            "Failed to rename temp config file to: {}",
            path.display()
        ))?;

        Ok(())
    }

    /// Validates configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero history limit or an empty host.
    pub fn validate(&self) -> Result<()> {
        if self.studio.history_limit == 0 {
            bail!("studio.history_limit must be at least 1");
        }
        if self.server.host.trim().is_empty() {
            bail!("server.host cannot be empty");
        }
        Ok(())
    }

    /// Sets a value by dotted key (`studio.autosave_delay_ms`, ...).
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown key or a value of the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "paths.workspace" => self.paths.workspace = Some(PathBuf::from(value)),
            "paths.plugins" => self.paths.plugins = Some(PathBuf::from(value)),
            "studio.autosave_delay_ms" => {
                self.studio.autosave_delay_ms = value
                    .parse()
                    .context(format!("Invalid delay '{value}': expected milliseconds"))?;
            }
            "studio.history_limit" => {
                self.studio.history_limit = value
                    .parse()
                    .context(format!("Invalid history limit '{value}'"))?;
            }
            "studio.default_breakpoint" => self.studio.default_breakpoint = value.parse()?,
            "server.host" => self.server.host = value.to_string(),
            "server.port" => {
                self.server.port = value.parse().context(format!("Invalid port '{value}'"))?;
            }
            _ => bail!("Unknown configuration key '{key}'"),
        }
        self.validate()
    }

    /// Workspace directory, defaulting to `<config dir>/pages`.
    ///
    /// # Errors
    ///
    /// See [`Self::config_dir`].
    pub fn workspace_dir(&self) -> Result<PathBuf> {
        match &self.paths.workspace {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("pages")),
        }
    }

    /// Plugin manifest directory, defaulting to `<config dir>/plugins`.
    ///
    /// # Errors
    ///
    /// See [`Self::config_dir`].
    pub fn plugins_dir(&self) -> Result<PathBuf> {
        match &self.paths.plugins {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("plugins")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.paths.workspace, None);
        assert_eq!(config.studio.autosave_delay_ms, 1000);
        assert_eq!(config.studio.history_limit, 50);
        assert_eq!(config.studio.default_breakpoint, Breakpoint::Desktop);
        assert_eq!(config.server.port, 3002);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::new();
        config.set("paths.workspace", "/srv/pages").unwrap();
        config.set("studio.autosave_delay_ms", "250").unwrap();
        config.set("studio.default_breakpoint", "mobile").unwrap();
        config.save_to(&config_file).unwrap();

        let loaded = Config::load_from(&config_file).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.studio.autosave_delay(), Duration::from_millis(250));
        assert!(!config_file.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        fs::write(&config_file, "[server]\nport = 8080\n").unwrap();

        let loaded = Config::load_from(&config_file).unwrap();
        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.server.host, DEFAULT_HOST);
        assert_eq!(loaded.studio, StudioConfig::default());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::new();
        assert!(config.set("server.port", "http").is_err());
        assert!(config.set("studio.history_limit", "0").is_err());
        assert!(config.set("studio.default_breakpoint", "watch").is_err());
        assert!(config.set("nope", "1").is_err());
    }
}
