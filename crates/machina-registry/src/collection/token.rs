//! Token inventories
//!
//! A token is a per-scene instance of an actor with its own synthetic
//! inventory. The wrapper holds only the token id and re-locates the token on
//! the active scene for every call, since the token may have left the scene
//! since the wrapper was built.

use super::{create_in, destroy_in, enumerate_in, get_in, update_in, CollectionWrapper, RegEntry};
use crate::error::{RegistryError, RegistryResult};
use crate::model::{Category, RawData};
use async_trait::async_trait;
use machina_storage::{DocumentStore, OwnerKey, Scope};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Wrapper over a token's embedded items
pub struct TokenInventoryCollection {
    category: Category,
    token_id: String,
    store: Arc<dyn DocumentStore>,
}

impl TokenInventoryCollection {
    pub fn new(category: Category, token_id: impl Into<String>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            category,
            token_id: token_id.into(),
            store,
        }
    }

    /// Whether the token is currently on the active scene
    async fn present(&self) -> RegistryResult<bool> {
        let found = self.store.find_token(&self.token_id).await?.is_some();
        if !found {
            warn!(token_id = %self.token_id, category = %self.category, "token not on active scene");
        }
        Ok(found)
    }

    async fn require_present(&self) -> RegistryResult<()> {
        if self.present().await? {
            Ok(())
        } else {
            Err(RegistryError::OwnerUnavailable {
                owner: format!("token {}", self.token_id),
            })
        }
    }
}

#[async_trait]
impl CollectionWrapper for TokenInventoryCollection {
    fn category(&self) -> Category {
        self.category
    }

    fn scope(&self) -> Scope {
        Scope::Inventory(OwnerKey::Token(self.token_id.clone()))
    }

    #[instrument(skip(self, raws), fields(category = %self.category, token_id = %self.token_id, count = raws.len()))]
    async fn create(&self, raws: Vec<RawData>) -> RegistryResult<Vec<RegEntry>> {
        self.require_present().await?;
        create_in(self.store.as_ref(), self.category, &self.scope(), raws).await
    }

    async fn get(&self, id: &str) -> RegistryResult<Option<RegEntry>> {
        if !self.present().await? {
            return Ok(None);
        }
        get_in(self.store.as_ref(), self.category, &self.scope(), id).await
    }

    async fn update(&self, entries: Vec<RegEntry>) -> RegistryResult<()> {
        if !self.present().await? {
            // Same treatment as updates to missing ids
            return Ok(());
        }
        update_in(self.store.as_ref(), self.category, &self.scope(), entries).await?;
        Ok(())
    }

    async fn destroy(&self, id: &str) -> RegistryResult<Option<RawData>> {
        if !self.present().await? {
            return Ok(None);
        }
        destroy_in(self.store.as_ref(), self.category, &self.scope(), id).await
    }

    async fn enumerate(&self) -> RegistryResult<Vec<RegEntry>> {
        if !self.present().await? {
            return Ok(Vec::new());
        }
        enumerate_in(self.store.as_ref(), self.category, &self.scope()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MechData, SystemData};
    use machina_storage::{MemoryStore, NewDocument};

    async fn scene_with_token() -> (MemoryStore, String) {
        let store = MemoryStore::new();
        let mech = RawData::Mech(MechData::default()).to_value().unwrap();
        let actor = store
            .create(&Scope::Actors, vec![NewDocument::new("mech", "Blackbeard", "", mech)])
            .await
            .unwrap()
            .remove(0);
        store.add_scene("s1", "Hangar").await;
        store.set_active_scene(Some("s1")).await;
        let token = store.spawn_token("s1", &actor.id).await.unwrap();
        (store, token.id)
    }

    #[tokio::test]
    async fn test_token_inventory_follows_scene() {
        let (store, token_id) = scene_with_token().await;
        let systems = TokenInventoryCollection::new(
            Category::MechSystem,
            token_id.clone(),
            Arc::new(store.clone()),
        );

        let raw = RawData::MechSystem(SystemData {
            name: "Jammer".into(),
            ..Default::default()
        });
        let entry = systems.create(vec![raw]).await.unwrap().remove(0);
        assert!(systems.get(&entry.id).await.unwrap().is_some());

        store.set_active_scene(None).await;
        assert!(systems.get(&entry.id).await.unwrap().is_none());
        assert!(systems.enumerate().await.unwrap().is_empty());
        let err = systems
            .create(vec![RawData::default_for(Category::MechSystem)])
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::OwnerUnavailable { .. }));

        store.set_active_scene(Some("s1")).await;
        assert_eq!(systems.enumerate().await.unwrap().len(), 1);
    }
}
