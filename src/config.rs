//! Service configuration loaded from TOML.
//!
//! Every section and field is optional; missing values fall back to
//! defaults. The `[search]` table mirrors
//! [`assetscout_search::SearchConfig`] field for field.

use std::path::{Path, PathBuf};

use assetscout_search::SearchConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "ASSETSCOUT_CONFIG";

/// Top-level configuration for the assetscout service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub search: SearchConfig,
    pub cache: CacheHeaderConfig,
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Use `0` to let the OS pick a free port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8787,
        }
    }
}

/// Lifetimes advertised to shared caches on successful responses, in
/// seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheHeaderConfig {
    pub assets_max_age: u64,
    pub assets_swr: u64,
    pub docs_max_age: u64,
    pub docs_swr: u64,
}

impl Default for CacheHeaderConfig {
    fn default() -> Self {
        Self {
            assets_max_age: 300,
            assets_swr: 600,
            docs_max_age: 3600,
            docs_swr: 86400,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, cannot be parsed, or
    /// holds an invalid `[search]` section.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from [`Self::resolve_path`] if that file exists, otherwise use
    /// defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_file`] when the file exists.
    pub fn load() -> Result<Self> {
        let path = Self::resolve_path();
        if path.exists() {
            tracing::info!(path = %path.display(), "loading config");
            Self::from_file(&path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// `$ASSETSCOUT_CONFIG` when set, otherwise [`Self::default_config_path`].
    pub fn resolve_path() -> PathBuf {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => Self::default_config_path(),
        }
    }

    /// Returns the default config file path: `~/.config/assetscout/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("assetscout").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("assetscout")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/assetscout-config/config.toml")
        }
    }

    /// Checks the search section.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Search`] wrapping the search config error.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        Ok(())
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
