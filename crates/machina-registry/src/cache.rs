//! Registry name cache
//!
//! Remembers, per registry name, the parsed and owner-verified configuration
//! so that a repeated `switch_reg` skips parsing and owner lookup. Registries
//! are stateless views over the store, so a cached configuration never holds
//! stale data; at worst it names an owner that has since been deleted, in which
//! case its collections read as empty.
//!
//! Token inventories are never cached: whether a token is reachable depends on
//! which scene is active.

use crate::name::{ItemSource, RegConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Injectable name → registry configuration memo
#[derive(Debug)]
pub struct RegistryCache {
    enabled: bool,
    entries: Mutex<HashMap<String, RegConfig>>,
    hits: AtomicU64,
}

impl Default for RegistryCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RegistryCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RegConfig>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, name: &str) -> Option<RegConfig> {
        if !self.enabled {
            return None;
        }
        let found = self.lock().get(name).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Remember a verified configuration
    pub fn insert(&self, config: &RegConfig) {
        if !self.enabled || matches!(config.items, ItemSource::TokenInventory(_)) {
            return;
        }
        self.lock().insert(config.name(), config.clone());
    }

    /// Forget every registry scoped to `owner_id`'s inventory
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_owner(&self, owner_id: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, config| config.owner().map_or(true, |o| o.id() != owner_id));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(owner_id, removed, "registry cache entries invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Lookups answered from the cache
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}
