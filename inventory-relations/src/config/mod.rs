//! Sync executor configuration
//!
//! Plain struct with sane defaults, named presets and a builder. Can be read
//! from `<config dir>/inventory-admin/sync.toml` and overridden through
//! `INVENTORY_SYNC_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "inventory-admin";
const CONFIG_FILE: &str = "sync.toml";
const ENV_PREFIX: &str = "INVENTORY_SYNC_";

/// Configuration for the relation sync executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Treat `NotFound` on delete as success (the record is already gone)
    pub missing_delete_is_success: bool,
    /// Stop issuing calls after a malformed store response
    pub abort_on_fatal: bool,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => anyhow::bail!("Unknown log level: {}", other),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            missing_delete_is_success: false,
            abort_on_fatal: true,
            log_level: LogLevel::Info,
        }
    }
}

impl SyncConfig {
    /// Create a new builder for SyncConfig
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::new()
    }

    /// Every non-success answer counts as a failure
    pub fn strict() -> Self {
        Self {
            missing_delete_is_success: false,
            abort_on_fatal: true,
            log_level: LogLevel::Warn,
        }
    }

    /// Tolerates already-deleted records and keeps going past bad responses
    pub fn lenient() -> Self {
        Self {
            missing_delete_is_success: true,
            abort_on_fatal: false,
            log_level: LogLevel::Info,
        }
    }

    /// `<config dir>/inventory-admin/sync.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse sync config")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sync config: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid sync config: {}", path.display()))
    }

    /// Load from the default path (when present), then apply environment
    /// overrides. `.env` files are honoured.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from(Self::default_path().as_deref(), |key| std::env::var(key).ok())
    }

    /// Load from `path` if it exists, then apply overrides read via `lookup`
    pub fn load_from<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) if path.exists() => {
                log::debug!("Loading sync config from {}", path.display());
                Self::load_from_file(path)?
            }
            _ => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Apply `INVENTORY_SYNC_*` overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = var("MISSING_DELETE_IS_SUCCESS") {
            self.missing_delete_is_success = parse_bool(&value)
                .context("Invalid INVENTORY_SYNC_MISSING_DELETE_IS_SUCCESS")?;
        }
        if let Some(value) = var("ABORT_ON_FATAL") {
            self.abort_on_fatal =
                parse_bool(&value).context("Invalid INVENTORY_SYNC_ABORT_ON_FATAL")?;
        }
        if let Some(value) = var("LOG_LEVEL") {
            self.log_level = value.parse().context("Invalid INVENTORY_SYNC_LOG_LEVEL")?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

/// Builder for SyncConfig
#[derive(Debug)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    /// Count `NotFound` on delete as success
    pub fn missing_delete_is_success(mut self, enabled: bool) -> Self {
        self.config.missing_delete_is_success = enabled;
        self
    }

    /// Stop at the first malformed store response
    pub fn abort_on_fatal(mut self, enabled: bool) -> Self {
        self.config.abort_on_fatal = enabled;
        self
    }

    /// Set logging level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> SyncConfig {
        self.config
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
