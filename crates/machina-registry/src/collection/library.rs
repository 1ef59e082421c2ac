//! Library packs
//!
//! TigerStyle: Lazy index, surgically maintained.
//!
//! Template content lives in one pack per category (`library.<category>`).
//! Listing a pack is the expensive host call, so the first access loads the
//! whole pack into a shared [`LibraryIndex`] and later reads are served from
//! it. Creates, updates, and destroys through a wrapper patch the index in the
//! same critical section as the store write.

use super::{entry_from_doc, new_document, update_in, CollectionWrapper, RegEntry};
use crate::error::RegistryResult;
use crate::model::{Category, RawData};
use async_trait::async_trait;
use machina_storage::{DocumentStore, Scope};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

type PackIndex = BTreeMap<String, RegEntry>;

/// Loaded pack contents shared by every library wrapper of one environment
#[derive(Debug, Default)]
pub struct LibraryIndex {
    packs: RwLock<HashMap<String, PackIndex>>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a pack's index so the next access reloads it
    pub async fn invalidate(&self, pack: &str) {
        if self.packs.write().await.remove(pack).is_some() {
            debug!(pack, "library index invalidated");
        }
    }

    /// Drop every loaded pack
    pub async fn clear(&self) {
        self.packs.write().await.clear();
    }

    /// Whether a pack is currently loaded
    pub async fn is_loaded(&self, pack: &str) -> bool {
        self.packs.read().await.contains_key(pack)
    }
}

/// Wrapper over one library pack
pub struct LibraryCollection {
    category: Category,
    store: Arc<dyn DocumentStore>,
    index: Arc<LibraryIndex>,
}

impl LibraryCollection {
    pub fn new(category: Category, store: Arc<dyn DocumentStore>, index: Arc<LibraryIndex>) -> Self {
        Self {
            category,
            store,
            index,
        }
    }

    fn pack(&self) -> String {
        self.category.pack_name()
    }

    /// Run `f` over the pack index, loading it first if needed
    async fn with_index<T>(&self, f: impl FnOnce(&PackIndex) -> T) -> RegistryResult<T> {
        {
            let packs = self.index.packs.read().await;
            if let Some(index) = packs.get(&self.pack()) {
                return Ok(f(index));
            }
        }

        let mut packs = self.index.packs.write().await;
        let index = match packs.entry(self.pack()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let scope = self.scope();
                let docs = self.store.list(&scope).await?;
                let loaded: PackIndex = docs
                    .into_iter()
                    .filter_map(|doc| entry_from_doc(self.category, &scope, doc))
                    .map(|e| (e.id.clone(), e))
                    .collect();
                debug!(pack = %self.pack(), count = loaded.len(), "library index loaded");
                entry.insert(loaded)
            }
        };
        Ok(f(index))
    }
}

#[async_trait]
impl CollectionWrapper for LibraryCollection {
    fn category(&self) -> Category {
        self.category
    }

    fn scope(&self) -> Scope {
        Scope::Pack(self.pack())
    }

    #[instrument(skip(self, raws), fields(pack = %self.pack(), count = raws.len()))]
    async fn create(&self, raws: Vec<RawData>) -> RegistryResult<Vec<RegEntry>> {
        let docs = raws
            .iter()
            .map(new_document)
            .collect::<RegistryResult<Vec<_>>>()?;
        let scope = self.scope();
        let mut packs = self.index.packs.write().await;
        let created: Vec<RegEntry> = self
            .store
            .create(&scope, docs)
            .await?
            .into_iter()
            .filter_map(|doc| entry_from_doc(self.category, &scope, doc))
            .collect();
        if let Some(index) = packs.get_mut(&self.pack()) {
            for entry in &created {
                index.insert(entry.id.clone(), entry.clone());
            }
        }
        Ok(created)
    }

    async fn get(&self, id: &str) -> RegistryResult<Option<RegEntry>> {
        self.with_index(|index| index.get(id).cloned()).await
    }

    async fn update(&self, entries: Vec<RegEntry>) -> RegistryResult<()> {
        let scope = self.scope();
        let mut packs = self.index.packs.write().await;
        let written = update_in(self.store.as_ref(), self.category, &scope, entries).await?;
        if let Some(index) = packs.get_mut(&self.pack()) {
            for entry in written {
                if let Some(slot) = index.get_mut(&entry.id) {
                    *slot = entry;
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self), fields(pack = %self.pack()))]
    async fn destroy(&self, id: &str) -> RegistryResult<Option<RawData>> {
        let existing = self.get(id).await?;
        if existing.is_none() {
            return Ok(None);
        }
        let scope = self.scope();
        let mut packs = self.index.packs.write().await;
        let removed = self.store.delete(&scope, id).await?;
        if let Some(index) = packs.get_mut(&self.pack()) {
            index.remove(id);
        }
        Ok(removed
            .and_then(|doc| entry_from_doc(self.category, &scope, doc))
            .map(|entry| entry.raw))
    }

    async fn enumerate(&self) -> RegistryResult<Vec<RegEntry>> {
        self.with_index(|index| index.values().cloned().collect()).await
    }
}
