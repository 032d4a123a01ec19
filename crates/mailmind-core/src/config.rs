//! Application configuration management.
//!
//! This module resolves the backend base URL and loads the persisted
//! settings (an optional backend URL and the session storage backend).
//!
//! Configuration is stored at `~/.config/mailmind/config.json`. The backend
//! URL is resolved in this order: `MAILMIND_API_URL`, the config file, then
//! the default for the current environment (`MAILMIND_ENV`).

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::{FileStorage, KeyringStorage, Storage};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "mailmind";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides the backend base URL
pub const API_URL_ENV: &str = "MAILMIND_API_URL";

/// Selects the environment default (`development` or `production`)
pub const ENVIRONMENT_ENV: &str = "MAILMIND_ENV";

pub const DEVELOPMENT_API_URL: &str = "http://localhost:5000/api";
pub const PRODUCTION_API_URL: &str = "https://emailmanageriatesting.onrender.com/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Read `MAILMIND_ENV`; without it, debug builds are development.
    pub fn detect() -> Self {
        match std::env::var(ENVIRONMENT_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring {}", ENVIRONMENT_ENV);
                Self::build_default()
            }),
            Err(_) => Self::build_default(),
        }
    }

    fn build_default() -> Self {
        if cfg!(debug_assertions) {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    pub fn default_api_url(self) -> &'static str {
        match self {
            Environment::Development => DEVELOPMENT_API_URL,
            Environment::Production => PRODUCTION_API_URL,
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(anyhow::anyhow!("unknown environment '{}'", other)),
        }
    }
}

/// Where the session is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `storage.json` in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// The backend base URL for this process.
    pub fn resolve_api_url(&self) -> String {
        self.api_url_with(std::env::var(API_URL_ENV).ok(), Environment::detect())
    }

    fn api_url_with(&self, env_override: Option<String>, environment: Environment) -> String {
        env_override
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone().filter(|url| !url.trim().is_empty()))
            .unwrap_or_else(|| environment.default_api_url().to_string())
    }

    /// Open the configured session storage.
    pub fn open_storage(&self) -> Result<Box<dyn Storage>> {
        match self.storage {
            StorageBackend::File => {
                let dir = Self::cache_dir()?;
                let storage = FileStorage::open(&dir).context("Failed to open session storage")?;
                Ok(Box::new(storage))
            }
            StorageBackend::Keyring => Ok(Box::new(KeyringStorage::new())),
        }
    }
}
