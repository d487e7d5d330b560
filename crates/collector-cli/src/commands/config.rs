//! Config command implementation.
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/collector/config.toml`
//! - macOS: `~/Library/Application Support/collector/config.toml`
//! - Windows: `%APPDATA%\collector\config.toml`

use crate::actions::ConfigAction;
use crate::formatters::format_output;
use anyhow::{Context, Result};
use collector_core::cli::{ExitCode, OutputFormat};
use collector_wasm_runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// CLI configuration.
///
/// # Examples
///
/// ```toml
/// [general]
/// default_format = "pretty"
/// log_level = "info"
///
/// [runtime]
/// memory_mb = 64
/// entry_timeout_secs = 30
/// settle_timeout_secs = 30
/// module_cache_capacity = 32
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Guest runtime limits
    #[serde(default)]
    pub runtime: RuntimeSettings,
}

/// General configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format (json, text, pretty)
    pub default_format: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Guest runtime limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Maximum guest linear memory in MB
    pub memory_mb: usize,

    /// Entry-point timeout in seconds
    pub entry_timeout_secs: u64,

    /// Promise settlement timeout in seconds
    pub settle_timeout_secs: u64,

    /// Number of compiled modules kept in memory
    pub module_cache_capacity: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_format: "pretty".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            memory_mb: RuntimeConfig::DEFAULT_MEMORY_LIMIT_MB,
            entry_timeout_secs: RuntimeConfig::DEFAULT_ENTRY_TIMEOUT_SECS,
            settle_timeout_secs: RuntimeConfig::DEFAULT_SETTLE_TIMEOUT_SECS,
            module_cache_capacity: RuntimeConfig::DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl RuntimeSettings {
    /// Builds the runtime configuration, optionally overriding memory.
    #[must_use]
    pub fn to_runtime_config(&self, memory_mb: Option<usize>) -> RuntimeConfig {
        RuntimeConfig::builder()
            .memory_limit_mb(memory_mb.unwrap_or(self.memory_mb))
            .entry_timeout(Duration::from_secs(self.entry_timeout_secs))
            .settle_timeout(Duration::from_secs(self.settle_timeout_secs))
            .module_cache_capacity(self.module_cache_capacity)
            .build()
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let valid_formats = ["json", "text", "pretty"];
        if !valid_formats.contains(&self.general.default_format.as_str()) {
            anyhow::bail!(
                "invalid default_format '{}', must be one of: {}",
                self.general.default_format,
                valid_formats.join(", ")
            );
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            anyhow::bail!(
                "invalid log_level '{}', must be one of: {}",
                self.general.log_level,
                valid_levels.join(", ")
            );
        }

        if self.runtime.memory_mb > 4096 {
            anyhow::bail!("runtime.memory_mb cannot exceed 4096 MB (4 GB)");
        }

        self.runtime
            .to_runtime_config(None)
            .validate()
            .context("invalid [runtime] section")?;

        Ok(())
    }
}

/// Default configuration file path.
///
/// # Errors
///
/// Returns an error if the platform has no configuration directory.
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("failed to determine config directory")?;

    Ok(config_dir.join("collector").join("config.toml"))
}

/// Loads configuration from the default path, or defaults if absent.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Loads configuration from `path`, or defaults if it does not exist.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("Config file not found, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;

    config.validate()?;

    Ok(config)
}

/// Saves configuration to `path`, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    config.validate()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    let toml_str = toml::to_string_pretty(config).context("failed to serialize config")?;

    fs::write(path, toml_str).context("failed to write config file")?;

    debug!("Saved config to {}", path.display());

    Ok(())
}

/// Initialization result.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InitResult {
    /// Whether a file was written
    pub success: bool,
    /// Status message
    pub message: String,
    /// Path of the configuration file
    pub path: String,
}

/// Configuration file location.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PathResult {
    /// Path of the configuration file
    pub path: String,
    /// Whether the file exists
    pub exists: bool,
}

/// Runs the config command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read, written or
/// formatted.
pub async fn run(action: ConfigAction, output_format: OutputFormat) -> Result<ExitCode> {
    info!("Config action: {:?}", action);

    let path = config_path()?;
    let output = match action {
        ConfigAction::Show => format_output(&load_config_from(&path)?, output_format)?,
        ConfigAction::Path => format_output(
            &PathResult {
                path: path.display().to_string(),
                exists: path.exists(),
            },
            output_format,
        )?,
        ConfigAction::Init { force } => format_output(&init_config_at(&path, force)?, output_format)?,
    };

    println!("{output}");
    Ok(ExitCode::SUCCESS)
}

/// Writes a default configuration file at `path`.
///
/// An existing file is left alone unless `force` is set.
pub fn init_config_at(path: &Path, force: bool) -> Result<InitResult> {
    if path.exists() && !force {
        return Ok(InitResult {
            success: false,
            message: "configuration file already exists".to_string(),
            path: path.display().to_string(),
        });
    }

    save_config_to(&Config::default(), path)?;

    Ok(InitResult {
        success: true,
        message: "configuration file created with default values".to_string(),
        path: path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.default_format, "pretty");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.runtime.memory_mb, 64);
        assert_eq!(config.runtime.settle_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_format() {
        let mut config = Config::default();
        config.general.default_format = "yaml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.general.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_runtime_values() {
        let mut config = Config::default();
        config.runtime.settle_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.runtime.module_cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_excessive_memory() {
        let mut config = Config::default();
        config.runtime.memory_mb = 8192;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[runtime]\nmemory_mb = 16\n").unwrap();
        assert_eq!(config.runtime.memory_mb, 16);
        assert_eq!(config.runtime.entry_timeout_secs, 30);
        assert_eq!(config.general, GeneralConfig::default());
    }

    #[test]
    fn test_runtime_config_override() {
        let settings = RuntimeSettings::default();
        let runtime = settings.to_runtime_config(Some(8));
        assert_eq!(runtime.memory_limit_bytes(), 8 * 1024 * 1024);
        assert_eq!(runtime.settle_timeout(), Duration::from_secs(30));

        let runtime = settings.to_runtime_config(None);
        assert_eq!(runtime.memory_limit_bytes(), 64 * 1024 * 1024);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[general]\nlog_level = \"loud\"\n").unwrap();
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn test_init_writes_defaults_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collector").join("config.toml");

        let first = init_config_at(&path, false).unwrap();
        assert!(first.success);
        assert_eq!(load_config_from(&path).unwrap(), Config::default());

        let second = init_config_at(&path, false).unwrap();
        assert!(!second.success);

        let forced = init_config_at(&path, true).unwrap();
        assert!(forced.success);
    }

    #[test]
    fn test_config_path_ends_with_collector() {
        if let Ok(path) = config_path() {
            assert!(path.ends_with("collector/config.toml"));
        }
    }
}
