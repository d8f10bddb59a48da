//! Broadcast configuration — loaded from `~/.broadcast/config.toml`.
//!
//! Every field has a default, so a missing or partial file is fine. Command
//! line flags are layered on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BroadcastError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Base URL of the OneBot HTTP API, without a trailing slash.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Optional `access_token` appended to every request.
    #[serde(default)]
    pub access_token: String,
    /// Pause between recipients, in seconds.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
    /// Probability (0..=100) that a pending recipient is messaged on this run.
    #[serde(default = "default_chance_percent")]
    pub chance_percent: u8,
    /// Directory holding text assets, snapshots and ledgers.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How often the asset store rescans the assets directory, in seconds.
    #[serde(default = "default_asset_refresh_secs")]
    pub asset_refresh_secs: u64,
}

fn default_api_base() -> String { "http://127.0.0.1:5700".into() }
fn default_delay_secs() -> u64 { 10 }
fn default_chance_percent() -> u8 { 100 }
fn default_assets_dir() -> String { ".".into() }
fn default_request_timeout_secs() -> u64 { 30 }
fn default_asset_refresh_secs() -> u64 { 2 }

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            access_token: String::new(),
            delay_secs: default_delay_secs(),
            chance_percent: default_chance_percent(),
            assets_dir: default_assets_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            asset_refresh_secs: default_asset_refresh_secs(),
        }
    }
}

impl BroadcastConfig {
    /// Load config from the default path, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BroadcastError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| {
            BroadcastError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.normalize();
        Ok(config)
    }

    /// Clamp out-of-range values and tidy the API base.
    pub fn normalize(&mut self) {
        if self.chance_percent > 100 {
            tracing::warn!(
                chance_percent = self.chance_percent,
                "chance_percent above 100, clamping"
            );
            self.chance_percent = 100;
        }
        while self.api_base.ends_with('/') {
            self.api_base.pop();
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn asset_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.asset_refresh_secs.max(1))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Broadcast home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".broadcast")
    }
}
