//! Configuration for machina
//!
//! TigerStyle: Explicit defaults, validation, reasonable limits.

use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for machina
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachinaConfig {
    /// Host store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Hydration configuration
    #[serde(default)]
    pub hydration: HydrationConfig,
}

impl MachinaConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.cache.validate()?;
        self.hydration.validate()?;
        Ok(())
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

/// Host store backend type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-memory store, optionally seeded from a JSON snapshot
    #[default]
    Memory,
}

/// Host store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type
    #[serde(default)]
    pub backend: StoreBackend,

    /// World snapshot to seed the store from
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.snapshot_path {
            if path.trim().is_empty() {
                return Err(Error::InvalidConfiguration {
                    field: "store.snapshot_path".into(),
                    reason: "must not be empty when set".into(),
                });
            }
        }
        Ok(())
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Sliding TTL of async fetch cache entries (milliseconds)
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Memoize registries by canonical name
    #[serde(default = "default_registry_cache_enabled")]
    pub registry_cache_enabled: bool,
}

fn default_fetch_timeout_ms() -> u64 {
    FETCH_CACHE_TIMEOUT_MS_DEFAULT
}

fn default_registry_cache_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            registry_cache_enabled: default_registry_cache_enabled(),
        }
    }
}

impl CacheConfig {
    fn validate(&self) -> Result<()> {
        if self.fetch_timeout_ms == 0 {
            return Err(Error::InvalidConfiguration {
                field: "cache.fetch_timeout_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.fetch_timeout_ms > FETCH_CACHE_TIMEOUT_MS_MAX {
            return Err(Error::InvalidConfiguration {
                field: "cache.fetch_timeout_ms".into(),
                reason: format!(
                    "{} exceeds limit {}",
                    self.fetch_timeout_ms, FETCH_CACHE_TIMEOUT_MS_MAX
                ),
            });
        }
        Ok(())
    }
}

/// Hydration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydrationConfig {
    /// Entry count past which an operation context logs a warning
    #[serde(default = "default_ctx_entries_max")]
    pub ctx_entries_max: usize,
}

fn default_ctx_entries_max() -> usize {
    OP_CTX_ENTRIES_COUNT_WARN
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            ctx_entries_max: default_ctx_entries_max(),
        }
    }
}

impl HydrationConfig {
    fn validate(&self) -> Result<()> {
        if self.ctx_entries_max == 0 {
            return Err(Error::InvalidConfiguration {
                field: "hydration.ctx_entries_max".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}
