//! Registry environment
//!
//! The bundle a top-level context owns and builds registries from: the host
//! store, I/O providers, configuration, the shared library index, and the
//! registry name cache. Nothing here is process-global; two environments over
//! the same store are fully independent.

use crate::cache::RegistryCache;
use crate::collection::LibraryIndex;
use crate::ctx::OpCtx;
use crate::error::RegistryResult;
use crate::name::RegConfig;
use crate::registry::Registry;
use machina_core::{IoContext, MachinaConfig};
use machina_storage::{DocumentStore, OwnerKey};
use std::fmt;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Shared state from which registries are built
pub struct RegistryEnv {
    store: Arc<dyn DocumentStore>,
    io: IoContext,
    config: MachinaConfig,
    library: Arc<LibraryIndex>,
    cache: RegistryCache,
}

impl fmt::Debug for RegistryEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEnv")
            .field("io", &self.io)
            .field("cache_entries", &self.cache.len())
            .finish()
    }
}

impl RegistryEnv {
    /// Environment with a registry cache configured from `config`
    pub fn new(store: Arc<dyn DocumentStore>, io: IoContext, config: MachinaConfig) -> Arc<Self> {
        let cache = RegistryCache::new(config.cache.registry_cache_enabled);
        Self::with_cache(store, io, config, cache)
    }

    /// Environment with a caller-supplied registry cache
    pub fn with_cache(
        store: Arc<dyn DocumentStore>,
        io: IoContext,
        config: MachinaConfig,
        cache: RegistryCache,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            io,
            config,
            library: Arc::new(LibraryIndex::new()),
            cache,
        })
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn io(&self) -> &IoContext {
        &self.io
    }

    pub fn config(&self) -> &MachinaConfig {
        &self.config
    }

    pub fn library_index(&self) -> &Arc<LibraryIndex> {
        &self.library
    }

    pub fn registry_cache(&self) -> &RegistryCache {
        &self.cache
    }

    /// Fresh operation context sized by configuration
    pub fn new_ctx(&self) -> OpCtx {
        OpCtx::with_warn_threshold(self.config.hydration.ctx_entries_max)
    }

    /// Build a registry for a known configuration
    pub fn registry(self: &Arc<Self>, config: RegConfig) -> Registry {
        Registry::new(self.clone(), config)
    }

    pub fn world(self: &Arc<Self>) -> Registry {
        self.registry(RegConfig::world())
    }

    pub fn library(self: &Arc<Self>) -> Registry {
        self.registry(RegConfig::library())
    }

    /// Registry over a token's inventory on the active scene
    pub fn token_inventory(self: &Arc<Self>, token_id: impl Into<String>) -> Registry {
        self.registry(RegConfig::token_inventory(token_id))
    }

    /// Rebuild the registry named `name`
    ///
    /// Owner-scoped names require the owner to be found first. Unparseable
    /// names and missing owners are logged and yield `None`.
    #[instrument(skip(self))]
    pub async fn switch_reg(self: &Arc<Self>, name: &str) -> Option<Registry> {
        if let Some(config) = self.cache.get(name) {
            return Some(self.registry(config));
        }

        let config = match RegConfig::parse(name) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "unparseable registry name");
                return None;
            }
        };

        if let Some(owner) = config.owner() {
            match self.owner_exists(&owner).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(owner_kind = owner.kind(), owner_id = owner.id(), "registry owner not found");
                    return None;
                }
                Err(e) => {
                    warn!(error = %e, "registry owner lookup failed");
                    return None;
                }
            }
        }

        self.cache.insert(&config);
        Some(self.registry(config))
    }

    async fn owner_exists(&self, owner: &OwnerKey) -> RegistryResult<bool> {
        Ok(match owner {
            OwnerKey::Actor(id) => self.store.find_actor(id).await?.is_some(),
            OwnerKey::Token(id) => self.store.find_token(id).await?.is_some(),
            OwnerKey::LibraryActor(id) => self.store.find_library_actor(id).await?.is_some(),
        })
    }
}
