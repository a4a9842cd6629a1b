//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! service URL, request timeout, viewport fetch pacing, the home map
//! position and (optionally) the OKAPI consumer credentials.
//!
//! Configuration is stored at `~/.config/opencache/config.json`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ApiSettings, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::auth::ConsumerCredentials;
use crate::models::Location;
use crate::viewport::{SettleMode, SyncSettings, DEFAULT_MIN_FETCH_INTERVAL, DEFAULT_SETTLE_DELAY};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "opencache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Initial map centre: Rudy, Silesia.
const DEFAULT_HOME: Location = Location {
    latitude: 50.196168,
    longitude: 18.446953,
};

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub request_timeout_secs: u64,
    pub min_fetch_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub settle_mode: SettleMode,
    pub home: Location,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            consumer_key: None,
            consumer_secret: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            min_fetch_interval_ms: DEFAULT_MIN_FETCH_INTERVAL.as_millis() as u64,
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            settle_mode: SettleMode::default(),
            home: DEFAULT_HOME,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for log files.
    pub fn log_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            min_fetch_interval: Duration::from_millis(self.min_fetch_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            settle_mode: self.settle_mode,
        }
    }

    /// Build client settings; credentials from the environment win over the file.
    pub fn api_settings(&self) -> Result<ApiSettings> {
        let credentials = ConsumerCredentials::resolve(
            self.consumer_key.as_deref(),
            self.consumer_secret.as_deref(),
        )?;
        Ok(ApiSettings {
            base_url: self.api_url.clone(),
            credentials,
            timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }

    /// Copy safe to print: the consumer secret is masked.
    pub fn redacted(&self) -> Self {
        Self {
            consumer_secret: self.consumer_secret.as_ref().map(|_| "<redacted>".to_string()),
            ..self.clone()
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.redacted();
        f.debug_struct("Config")
            .field("api_url", &shown.api_url)
            .field("consumer_key", &shown.consumer_key)
            .field("consumer_secret", &shown.consumer_secret)
            .field("request_timeout_secs", &shown.request_timeout_secs)
            .field("min_fetch_interval_ms", &shown.min_fetch_interval_ms)
            .field("settle_delay_ms", &shown.settle_delay_ms)
            .field("settle_mode", &shown.settle_mode)
            .field("home", &shown.home)
            .finish()
    }
}
