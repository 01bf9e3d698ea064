//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! API base URL, UI locale, where the credential pair is kept, and the last
//! used login email.
//!
//! Configuration is stored at `~/.config/docportal/config.json`. Environment
//! variables (`DOCPORTAL_BASE_URL`, `DOCPORTAL_LOCALE`) override the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_BASE_URL, REQUEST_TIMEOUT_SECS};
use crate::api::{normalize_locale, SessionClient};
use crate::auth::{FileTokenStore, KeyringTokenStore, TokenStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "docportal";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_BASE_URL: &str = "DOCPORTAL_BASE_URL";
pub const ENV_LOCALE: &str = "DOCPORTAL_LOCALE";

/// Where the credential pair is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub locale: Option<String>,
    #[serde(default)]
    pub token_backend: TokenBackend,
    pub last_email: Option<String>,
    pub request_timeout_secs: Option<u64>,
    /// Write a daily log file here in addition to stderr
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment overrides on top of the file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::var(ENV_BASE_URL).ok(), std::env::var(ENV_LOCALE).ok())
    }

    /// Override base URL and locale. Values are trimmed; blank ones are ignored.
    pub fn with_overrides(mut self, base_url: Option<String>, locale: Option<String>) -> Self {
        if let Some(url) = non_blank(base_url) {
            self.base_url = Some(url);
        }
        if let Some(locale) = non_blank(locale) {
            self.locale = Some(locale);
        }
        self
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Scheme and host of the API, for resolving relative asset paths.
    pub fn service_host(&self) -> String {
        reqwest::Url::parse(self.base_url())
            .map(|url| url.origin().ascii_serialization())
            .unwrap_or_else(|_| self.base_url().to_string())
    }

    pub fn locale(&self) -> &'static str {
        normalize_locale(self.locale.as_deref().unwrap_or(""))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS))
    }

    /// Open the configured credential store.
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.token_backend {
            TokenBackend::File => Arc::new(FileTokenStore::new(&self.data_dir()?)),
            TokenBackend::Keyring => Arc::new(KeyringTokenStore::new()),
        })
    }

    /// Build a session client from this configuration.
    pub fn session_client(&self) -> Result<SessionClient> {
        let store = self.token_store()?;
        SessionClient::with_timeout(self.base_url(), store, self.request_timeout())
            .context("Failed to create HTTP client")
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
