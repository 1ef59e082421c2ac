//! Live entities and hydration
//!
//! TigerStyle: Two-phase construction. Register, then hydrate.
//!
//! Reviving a record builds a placeholder, registers it in the operation
//! context, and only then resolves the references it holds. A reference that
//! leads back to an entity still being hydrated further up the same chain gets
//! the placeholder immediately; any other hit waits for readiness.

use crate::collection::{DocMeta, RegEntry};
use crate::ctx::OpCtx;
use crate::error::RegistryResult;
use crate::model::{Category, RawData};
use crate::reference::RegRef;
use crate::registry::Registry;
use futures::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::{watch, RwLock};
use tracing::debug;

// =============================================================================
// Links
// =============================================================================

/// A hydrated reference slot
#[derive(Debug, Clone)]
pub struct Link {
    reference: RegRef,
    target: Option<Weak<LiveEntity>>,
}

impl Link {
    /// The reference as stored
    pub fn reference(&self) -> &RegRef {
        &self.reference
    }

    /// The revived target, while the owning context is alive
    pub fn target(&self) -> Option<Arc<LiveEntity>> {
        self.target.as_ref().and_then(Weak::upgrade)
    }

    /// Whether resolution found a target
    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

// =============================================================================
// LiveEntity
// =============================================================================

#[derive(Debug)]
struct EntityState {
    raw: RawData,
    doc: DocMeta,
}

/// A revived entity bound to the registry it came from
pub struct LiveEntity {
    id: String,
    category: Category,
    lid: String,
    registry: Registry,
    state: RwLock<EntityState>,
    links: OnceLock<BTreeMap<String, Link>>,
    ready: watch::Sender<bool>,
}

impl fmt::Debug for LiveEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveEntity")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("registry", &self.registry.name())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl LiveEntity {
    pub(crate) fn placeholder(registry: Registry, entry: RegEntry) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            id: entry.id,
            category: entry.raw.category(),
            lid: entry.raw.lid().to_string(),
            registry,
            state: RwLock::new(EntityState {
                raw: entry.raw,
                doc: entry.doc,
            }),
            links: OnceLock::new(),
            ready,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Stable rules id at revival time
    pub fn lid(&self) -> &str {
        &self.lid
    }

    /// Registry the entity was revived from
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Reference to this entity, with its lid as fallback
    pub fn reg_ref(&self) -> RegRef {
        RegRef::new(
            self.id.clone(),
            self.category,
            self.registry.name(),
            self.lid.clone(),
        )
    }

    /// Copy of the current raw record
    pub async fn raw(&self) -> RawData {
        self.state.read().await.raw.clone()
    }

    /// Copy of the backing document metadata
    pub async fn doc(&self) -> DocMeta {
        self.state.read().await.doc.clone()
    }

    pub async fn name(&self) -> String {
        self.state.read().await.raw.name().to_string()
    }

    /// Mutate the raw record in place; call [`LiveEntity::save`] to persist
    pub async fn modify<T>(&self, f: impl FnOnce(&mut RawData) -> T) -> T {
        f(&mut self.state.write().await.raw)
    }

    /// Replace the display fields of the backing document
    pub async fn set_display(&self, name: impl Into<String>, img: impl Into<String>) {
        let mut state = self.state.write().await;
        state.doc.name = name.into();
        state.doc.img = img.into();
    }

    /// Registry over this entity's inventory, for actors
    pub fn inventory(&self) -> Option<Registry> {
        self.registry.inventory_of(self.category, &self.id)
    }

    /// Hydrated link at a slot path such as `loadout[0]`
    pub fn link(&self, path: &str) -> Option<Arc<LiveEntity>> {
        self.links.get()?.get(path)?.target()
    }

    /// Every hydrated slot in path order; empty until hydration finishes
    pub fn links(&self) -> Vec<(String, Link)> {
        self.links
            .get()
            .map(|links| links.iter().map(|(p, l)| (p.clone(), l.clone())).collect())
            .unwrap_or_default()
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until hydration of this entity has finished
    pub async fn ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives in self, so the channel cannot close while we wait
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Rename both the record and its backing document
    pub async fn rename(&self, name: impl Into<String>) {
        let name = name.into();
        let mut state = self.state.write().await;
        state.raw.set_name(name.clone());
        state.doc.name = name;
    }

    /// Write the raw record and document metadata back to the collection
    pub async fn save(&self) -> RegistryResult<()> {
        let entry = {
            let state = self.state.read().await;
            RegEntry {
                id: self.id.clone(),
                raw: state.raw.clone(),
                doc: state.doc.clone(),
            }
        };
        self.registry.get_cat(self.category).update_raw(vec![entry]).await
    }

    fn finish(&self, links: BTreeMap<String, Link>) {
        if self.links.set(links).is_err() {
            debug!(id = %self.id, "entity hydrated twice; keeping first links");
        }
        self.ready.send_replace(true);
    }
}

// =============================================================================
// Hydration
// =============================================================================

/// Ids being hydrated above the current point of recursion
#[derive(Debug, Clone, Default)]
pub(crate) struct HydrationChain(Vec<String>);

impl HydrationChain {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|c| c == id)
    }

    fn with(&self, id: &str) -> Self {
        let mut chain = self.0.clone();
        chain.push(id.to_string());
        Self(chain)
    }
}

/// Return a context hit, waiting for readiness unless it is our own ancestor
pub(crate) async fn settle(entity: Arc<LiveEntity>, chain: &HydrationChain) -> Arc<LiveEntity> {
    if !entity.is_ready() && !chain.contains(entity.id()) {
        entity.ready().await;
    }
    entity
}

/// Revive `entry` into `ctx`, hydrating its references
pub(crate) fn revive<'a>(
    registry: &'a Registry,
    ctx: &'a OpCtx,
    entry: RegEntry,
    chain: &'a HydrationChain,
) -> BoxFuture<'a, Arc<LiveEntity>> {
    async move {
        if let Some(existing) = ctx.get(&entry.id) {
            return settle(existing, chain).await;
        }

        let slots = entry.raw.refs();
        let entity = Arc::new(LiveEntity::placeholder(registry.clone(), entry));
        ctx.insert(entity.clone());

        let chain = chain.with(entity.id());
        let mut links = BTreeMap::new();
        for slot in slots {
            let target = if slot.reference.is_resolvable() {
                registry.resolve_in(ctx, &slot.reference, &chain).await
            } else {
                None
            };
            if target.is_none() {
                debug!(id = %entity.id, path = %slot.path, reference = %slot.reference, "reference unresolved");
            }
            links.insert(
                slot.path,
                Link {
                    reference: slot.reference,
                    target: target.as_ref().map(Arc::downgrade),
                },
            );
        }

        entity.finish(links);
        debug!(id = %entity.id, category = %entity.category, registry = %registry.name(), "entity revived");
        entity
    }
    .boxed()
}
