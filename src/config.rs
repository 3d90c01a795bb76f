//! Bridge configuration

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{SqlmuxError, SqlmuxResult};

/// Main bridge configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Create SQLite files that don't exist yet
    pub create_if_missing: bool,

    /// Log filter for the host binary (tracing-subscriber syntax)
    pub log: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            log: "warn".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration builder
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Default config location: `<config dir>/sqlmux/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sqlmux").join("config.toml"))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> SqlmuxResult<Self> {
        toml::from_str(text).map_err(|e| SqlmuxError::Config(e.to_string()))
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> SqlmuxResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SqlmuxError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Load from `path` if given, else from the default location if it
    /// exists, else defaults.
    pub fn discover(path: Option<&Path>) -> SqlmuxResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Builder for BridgeConfig
#[derive(Debug, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    /// Create missing SQLite files on open
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    /// Set the log filter
    pub fn log(mut self, filter: impl Into<String>) -> Self {
        self.config.log = filter.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> BridgeConfig {
        self.config
    }
}
