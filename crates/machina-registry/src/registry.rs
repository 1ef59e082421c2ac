//! Registries
//!
//! TigerStyle: Stateless proxies named by a pure function of configuration.
//!
//! A registry composes one collection wrapper per category over one storage
//! location and knows its canonical name. All state lives in the store (and
//! the environment's library index), so two registries with the same name are
//! interchangeable and building one is cheap.

use crate::accessor::CatReg;
use crate::collection::{
    CollectionWrapper, InventoryCollection, LibraryCollection, RegEntry, TokenInventoryCollection,
    WorldCollection,
};
use crate::ctx::OpCtx;
use crate::env::RegistryEnv;
use crate::live::{revive, settle, HydrationChain, LiveEntity};
use crate::model::Category;
use crate::name::{ActorSource, ItemSource, RegConfig};
use crate::reference::RegRef;
use futures::future::{BoxFuture, FutureExt};
use machina_storage::OwnerKey;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A document located by resolution, with the registry that holds it
#[derive(Debug, Clone)]
pub struct Resolved {
    pub registry: Registry,
    pub entry: RegEntry,
}

struct RegistryInner {
    env: Arc<RegistryEnv>,
    config: RegConfig,
    name: String,
    wrappers: Vec<Arc<dyn CollectionWrapper>>,
}

/// Uniform view over one storage location
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Registry").field(&self.inner.name).finish()
    }
}

impl Registry {
    pub fn new(env: Arc<RegistryEnv>, config: RegConfig) -> Self {
        let wrappers = Category::ALL
            .iter()
            .map(|category| build_wrapper(&env, &config, *category))
            .collect();
        Self {
            inner: Arc::new(RegistryInner {
                name: config.name(),
                env,
                config,
                wrappers,
            }),
        }
    }

    /// Canonical name, stable across restarts
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &RegConfig {
        &self.inner.config
    }

    pub fn env(&self) -> &Arc<RegistryEnv> {
        &self.inner.env
    }

    /// Per-category accessor
    pub fn get_cat(&self, category: Category) -> CatReg<'_> {
        CatReg::new(self, category, &self.inner.wrappers[category.index()])
    }

    /// Registry named `name`, reusing `self` when the names match
    pub async fn switch_reg(&self, name: &str) -> Option<Registry> {
        if name == self.name() {
            return Some(self.clone());
        }
        self.inner.env.switch_reg(name).await
    }

    /// Registry over the inventory of actor `actor_id` held by this registry
    ///
    /// `None` for item categories, which have no inventory.
    pub fn inventory_of(&self, category: Category, actor_id: &str) -> Option<Registry> {
        if !category.is_actor() {
            return None;
        }
        let config = match self.inner.config.actors {
            ActorSource::World => RegConfig::world_inventory(actor_id),
            ActorSource::Library => RegConfig::library_inventory(actor_id),
        };
        Some(Registry::new(self.inner.env.clone(), config))
    }

    /// Locate the document a reference points at
    ///
    /// References naming another registry are followed by switching. Within a
    /// registry, the id is tried first, then the fallback key against the
    /// stable id and then the display name. With no category on the
    /// reference, every category is searched.
    #[instrument(skip(self, reference), fields(registry = %self.name(), reference = %reference))]
    pub async fn resolve_to_document(&self, reference: &RegRef) -> Option<Resolved> {
        if !reference.registry_name.is_empty() && reference.registry_name != self.name() {
            let other = self.switch_reg(&reference.registry_name).await?;
            let entry = other.resolve_local(reference).await?;
            return Some(Resolved {
                registry: other,
                entry,
            });
        }
        let entry = self.resolve_local(reference).await?;
        Some(Resolved {
            registry: self.clone(),
            entry,
        })
    }

    async fn resolve_local(&self, reference: &RegRef) -> Option<RegEntry> {
        let categories: Vec<Category> = match reference.category {
            Some(category) => vec![category],
            None => Category::ALL.to_vec(),
        };

        if !reference.id.is_empty() {
            for category in &categories {
                if let Some(entry) = self.get_cat(*category).get_entry(&reference.id).await {
                    return Some(entry);
                }
            }
        }

        if reference.has_fallback() {
            for category in &categories {
                if let Some(entry) = self.get_cat(*category).lookup_by_key(&reference.fallback_key).await {
                    debug!(id = %entry.id, key = %reference.fallback_key, "resolved by fallback key");
                    return Some(entry);
                }
            }
        }

        None
    }

    /// Revive the entity a reference points at
    pub async fn resolve(&self, ctx: &OpCtx, reference: &RegRef) -> Option<Arc<LiveEntity>> {
        let chain = HydrationChain::root();
        self.resolve_in(ctx, reference, &chain).await
    }

    pub(crate) fn resolve_in<'a>(
        &'a self,
        ctx: &'a OpCtx,
        reference: &'a RegRef,
        chain: &'a HydrationChain,
    ) -> BoxFuture<'a, Option<Arc<LiveEntity>>> {
        async move {
            if !reference.id.is_empty() {
                if let Some(existing) = ctx.get(&reference.id) {
                    if reference.category.map_or(true, |c| c == existing.category()) {
                        return Some(settle(existing, chain).await);
                    }
                }
            }
            let resolved = self.resolve_to_document(reference).await?;
            Some(revive(&resolved.registry, ctx, resolved.entry, chain).await)
        }
        .boxed()
    }
}

fn build_wrapper(env: &Arc<RegistryEnv>, config: &RegConfig, category: Category) -> Arc<dyn CollectionWrapper> {
    let store = env.store().clone();
    let library = || LibraryCollection::new(category, store.clone(), env.library_index().clone());

    if category.is_actor() {
        return match config.actors {
            ActorSource::World => Arc::new(WorldCollection::new(category, store.clone())),
            ActorSource::Library => Arc::new(library()),
        };
    }

    match &config.items {
        ItemSource::World => Arc::new(WorldCollection::new(category, store.clone())),
        ItemSource::Library => Arc::new(library()),
        ItemSource::WorldInventory(id) => Arc::new(InventoryCollection::new(
            category,
            OwnerKey::Actor(id.clone()),
            store.clone(),
        )),
        ItemSource::LibraryInventory(id) => Arc::new(InventoryCollection::new(
            category,
            OwnerKey::LibraryActor(id.clone()),
            store.clone(),
        )),
        ItemSource::TokenInventory(id) => {
            Arc::new(TokenInventoryCollection::new(category, id.clone(), store.clone()))
        }
    }
}
