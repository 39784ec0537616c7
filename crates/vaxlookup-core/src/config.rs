//! Application configuration management.
//!
//! Configuration is stored at `~/.config/vaxlookup/config.json` (the
//! platform config directory) and can be overridden per run with
//! `VAXLOOKUP_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::{CacheSettings, FreshnessPolicy};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "vaxlookup";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "VAXLOOKUP_API_URL";
pub const ENV_API_KEY: &str = "VAXLOOKUP_API_KEY";
pub const ENV_SNAPSHOT: &str = "VAXLOOKUP_SNAPSHOT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project URL of the PostgREST service, e.g. `https://xyz.supabase.co`.
    pub api_url: Option<String>,
    /// Anon key sent with every REST request.
    pub api_key: Option<String>,
    /// JSON export to serve instead of the REST service.
    pub snapshot_path: Option<PathBuf>,
    pub cache_ttl_minutes: i64,
    pub cache_max_entries: usize,
    pub freshness: FreshnessPolicy,
}

impl Default for Config {
    fn default() -> Self {
        let cache = CacheSettings::default();
        Self {
            api_url: None,
            api_key: None,
            snapshot_path: None,
            cache_ttl_minutes: cache.ttl.num_minutes(),
            cache_max_entries: cache.max_entries,
            freshness: cache.freshness,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))
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

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Replace fields with non-empty values returned by `lookup` for the
    /// `VAXLOOKUP_*` variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_url = Some(url);
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(path) = get(ENV_SNAPSHOT) {
            self.snapshot_path = Some(PathBuf::from(path));
        }
    }

    /// Cache settings from this config. A TTL too large to represent falls
    /// back to the default.
    pub fn cache_settings(&self) -> CacheSettings {
        let defaults = CacheSettings::default();
        let ttl = Duration::try_minutes(self.cache_ttl_minutes).unwrap_or_else(|| {
            warn!(
                cache_ttl_minutes = self.cache_ttl_minutes,
                "cache_ttl_minutes out of range, using default"
            );
            defaults.ttl
        });
        CacheSettings {
            ttl,
            max_entries: self.cache_max_entries,
            freshness: self.freshness,
            ..defaults
        }
    }
}
