//! Owner inventories
//!
//! Items embedded in a persistent actor, either in the world or in a library
//! pack. Every operation is scoped to that owner's inventory.

use super::{create_in, destroy_in, enumerate_in, get_in, update_in, CollectionWrapper, RegEntry};
use crate::error::RegistryResult;
use crate::model::{Category, RawData};
use async_trait::async_trait;
use machina_storage::{DocumentStore, OwnerKey, Scope};
use std::sync::Arc;
use tracing::instrument;

/// Wrapper over one actor's embedded items
pub struct InventoryCollection {
    category: Category,
    owner: OwnerKey,
    store: Arc<dyn DocumentStore>,
}

impl InventoryCollection {
    pub fn new(category: Category, owner: OwnerKey, store: Arc<dyn DocumentStore>) -> Self {
        debug_assert!(!category.is_actor(), "inventories hold items only");
        Self {
            category,
            owner,
            store,
        }
    }

    pub fn owner(&self) -> &OwnerKey {
        &self.owner
    }
}

#[async_trait]
impl CollectionWrapper for InventoryCollection {
    fn category(&self) -> Category {
        self.category
    }

    fn scope(&self) -> Scope {
        Scope::Inventory(self.owner.clone())
    }

    #[instrument(skip(self, raws), fields(category = %self.category, owner = %self.owner.id(), count = raws.len()))]
    async fn create(&self, raws: Vec<RawData>) -> RegistryResult<Vec<RegEntry>> {
        create_in(self.store.as_ref(), self.category, &self.scope(), raws).await
    }

    async fn get(&self, id: &str) -> RegistryResult<Option<RegEntry>> {
        get_in(self.store.as_ref(), self.category, &self.scope(), id).await
    }

    async fn update(&self, entries: Vec<RegEntry>) -> RegistryResult<()> {
        update_in(self.store.as_ref(), self.category, &self.scope(), entries).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(category = %self.category, owner = %self.owner.id()))]
    async fn destroy(&self, id: &str) -> RegistryResult<Option<RawData>> {
        destroy_in(self.store.as_ref(), self.category, &self.scope(), id).await
    }

    async fn enumerate(&self) -> RegistryResult<Vec<RegEntry>> {
        enumerate_in(self.store.as_ref(), self.category, &self.scope()).await
    }
}
