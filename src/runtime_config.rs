// =============================================================================
// Panel Configuration — JSON file with env overrides and atomic save
// =============================================================================
//
// Every field carries `#[serde(default)]` so a partial (or empty) file still
// loads. A missing file is not an error: the service starts on defaults,
// logs a warning and writes the defaults to that path as an editable template. `PANEL_LISTEN_ADDR` and `PANEL_PROVIDER_URL` override the
// file after it is read.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::indicator_engine::IndicatorParams;
use crate::yahoo::client::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};

pub const DEFAULT_CONFIG_PATH: &str = "panel_config.json";
pub const ENV_CONFIG_PATH: &str = "PANEL_CONFIG";
pub const ENV_LISTEN_ADDR: &str = "PANEL_LISTEN_ADDR";
pub const ENV_PROVIDER_URL: &str = "PANEL_PROVIDER_URL";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_listen_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_cache_capacity() -> usize {
    128
}

fn default_cache_ttl_secs() -> Option<u64> {
    Some(300)
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

// =============================================================================
// ProviderConfig
// =============================================================================

/// Connection settings of the market-data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-HTTP-request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// =============================================================================
// CacheConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached series. Zero disables caching.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Entry lifetime; `null` keeps entries until evicted.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

// =============================================================================
// PanelConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Upper bound on one provider fetch, enforced by the loader.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default)]
    pub indicators: IndicatorParams,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            provider: ProviderConfig::default(),
            cache: CacheConfig::default(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            indicators: IndicatorParams::default(),
        }
    }
}

impl PanelConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.request_timeout_secs)
    }

    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read panel config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse panel config from {}", path.display()))?;

        info!(
            path = %path.display(),
            listen_addr = %config.listen_addr,
            cache_capacity = config.cache.capacity,
            "panel config loaded"
        );

        Ok(config)
    }

    /// Like [`PanelConfig::load`], but a missing file yields the defaults,
    /// which are also saved to `path`. Failing to write them only warns.
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "panel config not found, using defaults");
            let config = Self::default();
            if let Err(e) = config.save(path) {
                warn!(path = %path.display(), error = %e, "could not write default panel config");
            }
            return Ok(config);
        }
        Self::load(path)
    }

    /// Apply `PANEL_LISTEN_ADDR` / `PANEL_PROVIDER_URL` when set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_LISTEN_ADDR).ok(),
            std::env::var(ENV_PROVIDER_URL).ok(),
        );
    }

    fn apply_overrides(&mut self, listen_addr: Option<String>, provider_url: Option<String>) {
        if let Some(addr) = listen_addr.filter(|s| !s.trim().is_empty()) {
            info!(listen_addr = %addr, "listen address overridden from env");
            self.listen_addr = addr.trim().to_string();
        }
        if let Some(url) = provider_url.filter(|s| !s.trim().is_empty()) {
            info!(base_url = %url, "provider URL overridden from env");
            self.provider.base_url = url.trim().to_string();
        }
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise panel config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "panel config saved (atomic)");
        Ok(())
    }
}
