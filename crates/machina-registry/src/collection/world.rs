//! World collections
//!
//! Top-level items and actors not owned by anything.

use super::{create_in, destroy_in, enumerate_in, get_in, update_in, CollectionWrapper, RegEntry};
use crate::error::RegistryResult;
use crate::model::{Category, RawData};
use async_trait::async_trait;
use machina_storage::{DocumentStore, Scope};
use std::sync::Arc;
use tracing::instrument;

/// Wrapper over the world item or actor collection
pub struct WorldCollection {
    category: Category,
    store: Arc<dyn DocumentStore>,
}

impl WorldCollection {
    pub fn new(category: Category, store: Arc<dyn DocumentStore>) -> Self {
        Self { category, store }
    }
}

#[async_trait]
impl CollectionWrapper for WorldCollection {
    fn category(&self) -> Category {
        self.category
    }

    fn scope(&self) -> Scope {
        if self.category.is_actor() {
            Scope::Actors
        } else {
            Scope::Items
        }
    }

    #[instrument(skip(self, raws), fields(category = %self.category, count = raws.len()))]
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

    #[instrument(skip(self), fields(category = %self.category))]
    async fn destroy(&self, id: &str) -> RegistryResult<Option<RawData>> {
        destroy_in(self.store.as_ref(), self.category, &self.scope(), id).await
    }

    async fn enumerate(&self) -> RegistryResult<Vec<RegEntry>> {
        enumerate_in(self.store.as_ref(), self.category, &self.scope()).await
    }
}
