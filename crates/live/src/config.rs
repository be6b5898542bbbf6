// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is stored in `<config dir>/salon-live/config.toml`:
//!
//! ```toml
//! [realtime]
//! endpoint = "wss://salon.example.com/ws"
//! reconnect_delay_ms = 5000
//! connect_timeout_secs = 10
//!
//! [api]
//! base_url = "https://salon.example.com/api"
//! timeout_secs = 10
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::connection::{ConnectionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_DELAY};
use crate::error::{Error, Result};

const CONFIG_DIR_NAME: &str = "salon-live";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Live connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// `ws://` or `wss://` address of the push endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Fixed delay before reconnecting after an unexpected close (default: 5000).
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Max time for one connect attempt, handshake included (default: 10).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Read API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    ConnectionConfig::default().endpoint
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_millis() as u64
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_base_url() -> String {
    "http://localhost:3001/api".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        RealtimeConfig {
            endpoint: default_endpoint(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Default location of the config file, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl Config {
    /// Loads and validates the config at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise the default location.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_path() {
                Some(path) if path.is_file() => Self::load(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks endpoint schemes and numeric ranges.
    pub fn validate(&self) -> Result<()> {
        let endpoint = Url::parse(&self.realtime.endpoint)
            .map_err(|_| Error::InvalidEndpoint(self.realtime.endpoint.clone()))?;
        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(Error::InvalidEndpoint(self.realtime.endpoint.clone()));
        }

        let api = Url::parse(&self.api.base_url)
            .map_err(|_| Error::InvalidApiUrl(self.api.base_url.clone()))?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(Error::InvalidApiUrl(self.api.base_url.clone()));
        }

        if self.realtime.reconnect_delay_ms == 0 {
            return Err(Error::Config("reconnect_delay_ms must be greater than 0".to_string()));
        }
        if self.realtime.connect_timeout_secs == 0 {
            return Err(Error::Config("connect_timeout_secs must be greater than 0".to_string()));
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn to_connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            endpoint: self.realtime.endpoint.clone(),
            reconnect_delay: Duration::from_millis(self.realtime.reconnect_delay_ms),
            connect_timeout: Duration::from_secs(self.realtime.connect_timeout_secs),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
