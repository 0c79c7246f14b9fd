//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the API
//! base URL, the last used email and studio subdomain, and where the session
//! record is kept.
//!
//! Configuration is stored at `~/.config/photocrm/config.json`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::transport::DEFAULT_API_URL;
use crate::auth::{FileStorage, KeyringStorage, SessionStorage};

/// Application name used for config/data directory paths
const APP_NAME: &str = "photocrm";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "PHOTOCRM_API_URL";

/// Where the persisted session record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_email: Option<String>,
    pub last_subdomain: Option<String>,
    #[serde(default)]
    pub session_backend: SessionBackend,
}

impl Config {
    /// Read `config.json`, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file: {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read config: {}", path.display())),
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        std::fs::write(path, serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }

    fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("No config directory on this platform")?;
        Ok(base.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Base URL for the API: environment first, then config, then the default.
    pub fn api_base_url(&self) -> String {
        self.resolve_api_url(std::env::var(API_URL_ENV).ok())
    }

    fn resolve_api_url(&self, env_value: Option<String>) -> String {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_url.clone().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Directory holding the file-backed session record.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Open the configured session storage backend.
    pub fn session_storage(&self) -> Result<Arc<dyn SessionStorage>> {
        Ok(match self.session_backend {
            SessionBackend::File => Arc::new(FileStorage::new(self.data_dir()?)),
            SessionBackend::Keyring => Arc::new(KeyringStorage::new()),
        })
    }

    /// Remember the login identity for the next prompt.
    pub fn remember_login(&mut self, email: &str, subdomain: &str) {
        self.last_email = Some(email.to_string());
        self.last_subdomain = Some(subdomain.to_string());
    }
}
