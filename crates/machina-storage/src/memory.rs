//! In-memory document store
//!
//! For tests, the CLI, and anything that seeds a world from a snapshot.
//!
//! TigerStyle: Simple in-memory implementation, deterministic ordering by id.

use crate::document::{Document, NewDocument, OwnerKey, Scope, TokenInfo};
use crate::snapshot::{HolderSnapshot, PackSnapshot, SceneSnapshot, TokenSnapshot, WorldSnapshot};
use crate::store::DocumentStore;
use async_trait::async_trait;
use machina_core::{Error, IoContext, Result, DOC_CREATE_BATCH_COUNT_MAX};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

type DocMap = BTreeMap<String, Document>;

/// A document with an embedded inventory
#[derive(Debug, Clone)]
struct Holder {
    doc: Document,
    items: DocMap,
}

impl Holder {
    fn new(doc: Document) -> Self {
        Self {
            doc,
            items: DocMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Pack {
    locked: bool,
    docs: BTreeMap<String, Holder>,
}

#[derive(Debug, Clone)]
struct Token {
    info: TokenInfo,
    items: DocMap,
}

#[derive(Debug, Clone, Default)]
struct Scene {
    name: String,
    tokens: BTreeMap<String, Token>,
}

#[derive(Debug, Default)]
struct StoreState {
    items: DocMap,
    actors: BTreeMap<String, Holder>,
    packs: BTreeMap<String, Pack>,
    scenes: BTreeMap<String, Scene>,
    active_scene: Option<String>,
}

/// Read view over one physical collection
enum SlotRef<'a> {
    Docs(&'a DocMap),
    Holders(&'a BTreeMap<String, Holder>),
}

impl SlotRef<'_> {
    fn get(&self, id: &str) -> Option<Document> {
        match self {
            Self::Docs(docs) => docs.get(id).cloned(),
            Self::Holders(holders) => holders.get(id).map(|h| h.doc.clone()),
        }
    }

    fn list(&self) -> Vec<Document> {
        match self {
            Self::Docs(docs) => docs.values().cloned().collect(),
            Self::Holders(holders) => holders.values().map(|h| h.doc.clone()).collect(),
        }
    }
}

/// Write view over one physical collection
enum SlotMut<'a> {
    Docs(&'a mut DocMap),
    Holders(&'a mut BTreeMap<String, Holder>),
}

impl SlotMut<'_> {
    fn contains(&self, id: &str) -> bool {
        match self {
            Self::Docs(docs) => docs.contains_key(id),
            Self::Holders(holders) => holders.contains_key(id),
        }
    }

    fn insert(&mut self, doc: Document) {
        match self {
            Self::Docs(docs) => {
                docs.insert(doc.id.clone(), doc);
            }
            Self::Holders(holders) => {
                holders.insert(doc.id.clone(), Holder::new(doc));
            }
        }
    }

    /// Replace display fields and payload; returns false if absent
    fn replace(&mut self, doc: Document) -> bool {
        let existing = match self {
            Self::Docs(docs) => docs.get_mut(&doc.id),
            Self::Holders(holders) => holders.get_mut(&doc.id).map(|h| &mut h.doc),
        };
        match existing {
            Some(existing) => {
                existing.name = doc.name;
                existing.img = doc.img;
                existing.data = doc.data;
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, id: &str) -> Option<Document> {
        match self {
            Self::Docs(docs) => docs.remove(id),
            Self::Holders(holders) => holders.remove(id).map(|h| h.doc),
        }
    }
}

impl StoreState {
    fn active_token(&self, id: &str) -> Option<&Token> {
        let scene = self.active_scene.as_ref()?;
        self.scenes.get(scene)?.tokens.get(id)
    }

    fn slot(&self, scope: &Scope) -> Option<SlotRef<'_>> {
        match scope {
            Scope::Items => Some(SlotRef::Docs(&self.items)),
            Scope::Actors => Some(SlotRef::Holders(&self.actors)),
            Scope::Pack(name) => self.packs.get(name).map(|p| SlotRef::Holders(&p.docs)),
            Scope::Inventory(OwnerKey::Actor(id)) => {
                self.actors.get(id).map(|h| SlotRef::Docs(&h.items))
            }
            Scope::Inventory(OwnerKey::Token(id)) => {
                self.active_token(id).map(|t| SlotRef::Docs(&t.items))
            }
            Scope::Inventory(OwnerKey::LibraryActor(id)) => self
                .packs
                .values()
                .find_map(|p| p.docs.get(id))
                .map(|h| SlotRef::Docs(&h.items)),
        }
    }

    fn slot_mut(&mut self, scope: &Scope) -> Result<SlotMut<'_>> {
        match scope {
            Scope::Items => Ok(SlotMut::Docs(&mut self.items)),
            Scope::Actors => Ok(SlotMut::Holders(&mut self.actors)),
            Scope::Pack(name) => {
                let pack = self.packs.entry(name.clone()).or_default();
                if pack.locked {
                    return Err(Error::permission_denied(scope, "pack is locked"));
                }
                Ok(SlotMut::Holders(&mut pack.docs))
            }
            Scope::Inventory(OwnerKey::Actor(id)) => self
                .actors
                .get_mut(id)
                .map(|h| SlotMut::Docs(&mut h.items))
                .ok_or_else(|| Error::owner_not_found("actor", id.clone())),
            Scope::Inventory(OwnerKey::Token(id)) => {
                let scene = match self.active_scene.as_ref() {
                    Some(scene) => self.scenes.get_mut(scene),
                    None => None,
                };
                scene
                    .and_then(|s| s.tokens.get_mut(id))
                    .map(|t| SlotMut::Docs(&mut t.items))
                    .ok_or_else(|| Error::owner_not_found("token", id.clone()))
            }
            Scope::Inventory(OwnerKey::LibraryActor(id)) => {
                let pack = self
                    .packs
                    .values_mut()
                    .find(|p| p.docs.contains_key(id))
                    .ok_or_else(|| Error::owner_not_found("library_actor", id.clone()))?;
                if pack.locked {
                    return Err(Error::permission_denied(scope, "pack is locked"));
                }
                pack.docs
                    .get_mut(id)
                    .map(|h| SlotMut::Docs(&mut h.items))
                    .ok_or_else(|| Error::owner_not_found("library_actor", id.clone()))
            }
        }
    }
}

#[derive(Debug, Default)]
struct StatCounters {
    gets: AtomicU64,
    lists_world: AtomicU64,
    lists_pack: AtomicU64,
    lists_inventory: AtomicU64,
    writes: AtomicU64,
}

/// Point-in-time store call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Single-document reads
    pub gets: u64,
    /// Full listings of world items or actors
    pub lists_world: u64,
    /// Full listings of library packs
    pub lists_pack: u64,
    /// Full listings of embedded inventories
    pub lists_inventory: u64,
    /// Creates, updates and deletes
    pub writes: u64,
}

/// In-memory host document store
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
    stats: Arc<StatCounters>,
    io: IoContext,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").field("stats", &self.stats()).finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with production I/O providers
    pub fn new() -> Self {
        Self::with_io(IoContext::production())
    }

    /// Create an empty store with custom I/O providers
    pub fn with_io(io: IoContext) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            stats: Arc::new(StatCounters::default()),
            io,
        }
    }

    /// Create a store seeded from a snapshot
    pub fn from_snapshot(snapshot: WorldSnapshot, io: IoContext) -> Self {
        let mut state = StoreState {
            active_scene: snapshot.active_scene,
            ..Default::default()
        };

        for doc in snapshot.items {
            state.items.insert(doc.id.clone(), doc);
        }
        for holder in snapshot.actors {
            state.actors.insert(holder.doc.id.clone(), holder_from_snapshot(holder));
        }
        for pack in snapshot.packs {
            let docs = pack
                .documents
                .into_iter()
                .map(|h| (h.doc.id.clone(), holder_from_snapshot(h)))
                .collect();
            state.packs.insert(
                pack.name,
                Pack {
                    locked: pack.locked,
                    docs,
                },
            );
        }
        for scene in snapshot.scenes {
            let tokens = scene
                .tokens
                .into_iter()
                .map(|t| {
                    let token = Token {
                        info: TokenInfo {
                            id: t.id.clone(),
                            name: t.name,
                            img: t.img,
                            scene_id: scene.id.clone(),
                            actor_id: t.actor_id,
                        },
                        items: t.items.into_iter().map(|d| (d.id.clone(), d)).collect(),
                    };
                    (t.id, token)
                })
                .collect();
            state.scenes.insert(
                scene.id,
                Scene {
                    name: scene.name,
                    tokens,
                },
            );
        }

        Self {
            state: Arc::new(RwLock::new(state)),
            stats: Arc::new(StatCounters::default()),
            io,
        }
    }

    /// Capture the full store contents
    pub async fn snapshot(&self) -> WorldSnapshot {
        let state = self.state.read().await;
        WorldSnapshot {
            items: state.items.values().cloned().collect(),
            actors: state.actors.values().map(holder_to_snapshot).collect(),
            packs: state
                .packs
                .iter()
                .map(|(name, pack)| PackSnapshot {
                    name: name.clone(),
                    locked: pack.locked,
                    documents: pack.docs.values().map(holder_to_snapshot).collect(),
                })
                .collect(),
            scenes: state
                .scenes
                .iter()
                .map(|(id, scene)| SceneSnapshot {
                    id: id.clone(),
                    name: scene.name.clone(),
                    tokens: scene
                        .tokens
                        .values()
                        .map(|t| TokenSnapshot {
                            id: t.info.id.clone(),
                            name: t.info.name.clone(),
                            img: t.info.img.clone(),
                            actor_id: t.info.actor_id.clone(),
                            items: t.items.values().cloned().collect(),
                        })
                        .collect(),
                })
                .collect(),
            active_scene: state.active_scene.clone(),
        }
    }

    /// Current call counters
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            gets: self.stats.gets.load(Ordering::Relaxed),
            lists_world: self.stats.lists_world.load(Ordering::Relaxed),
            lists_pack: self.stats.lists_pack.load(Ordering::Relaxed),
            lists_inventory: self.stats.lists_inventory.load(Ordering::Relaxed),
            writes: self.stats.writes.load(Ordering::Relaxed),
        }
    }

    /// Lock or unlock a library pack against writes, creating it if absent
    pub async fn set_pack_locked(&self, pack: &str, locked: bool) {
        let mut state = self.state.write().await;
        state.packs.entry(pack.to_string()).or_default().locked = locked;
    }

    /// Add an empty scene
    pub async fn add_scene(&self, id: impl Into<String>, name: impl Into<String>) {
        let mut state = self.state.write().await;
        state.scenes.insert(
            id.into(),
            Scene {
                name: name.into(),
                tokens: BTreeMap::new(),
            },
        );
    }

    /// Choose the active scene; tokens elsewhere are unreachable
    pub async fn set_active_scene(&self, scene_id: Option<&str>) {
        let mut state = self.state.write().await;
        state.active_scene = scene_id.map(str::to_string);
    }

    /// Place a token for a world actor on a scene
    ///
    /// The token receives its own copy of the actor's inventory under fresh ids.
    #[instrument(skip(self))]
    pub async fn spawn_token(&self, scene_id: &str, actor_id: &str) -> Result<TokenInfo> {
        let mut state = self.state.write().await;

        let actor = state
            .actors
            .get(actor_id)
            .cloned()
            .ok_or_else(|| Error::owner_not_found("actor", actor_id))?;
        if !state.scenes.contains_key(scene_id) {
            return Err(Error::document_not_found(scene_id, "scenes"));
        }

        let token_id = self.io.gen_doc_id();
        let items = actor
            .items
            .values()
            .map(|item| {
                let id = self.io.gen_doc_id();
                let doc = Document {
                    id: id.clone(),
                    owner: Some(token_id.clone()),
                    ..item.clone()
                };
                (id, doc)
            })
            .collect();

        let info = TokenInfo {
            id: token_id.clone(),
            name: actor.doc.name.clone(),
            img: actor.doc.img.clone(),
            scene_id: scene_id.to_string(),
            actor_id: Some(actor_id.to_string()),
        };

        let scene = state
            .scenes
            .get_mut(scene_id)
            .ok_or_else(|| Error::document_not_found(scene_id, "scenes"))?;
        scene.tokens.insert(
            token_id,
            Token {
                info: info.clone(),
                items,
            },
        );

        Ok(info)
    }

    /// Remove a token from whichever scene holds it
    pub async fn remove_token(&self, token_id: &str) -> bool {
        let mut state = self.state.write().await;
        state
            .scenes
            .values_mut()
            .any(|scene| scene.tokens.remove(token_id).is_some())
    }
}

fn holder_from_snapshot(holder: HolderSnapshot) -> Holder {
    Holder {
        doc: holder.doc,
        items: holder.items.into_iter().map(|d| (d.id.clone(), d)).collect(),
    }
}

fn holder_to_snapshot(holder: &Holder) -> HolderSnapshot {
    HolderSnapshot {
        doc: holder.doc.clone(),
        items: holder.items.values().cloned().collect(),
    }
}

fn scope_owner(scope: &Scope) -> Option<String> {
    match scope {
        Scope::Inventory(owner) => Some(owner.id().to_string()),
        _ => None,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    #[instrument(skip(self, docs), fields(scope = %scope, count = docs.len()))]
    async fn create(&self, scope: &Scope, docs: Vec<NewDocument>) -> Result<Vec<Document>> {
        if docs.len() > DOC_CREATE_BATCH_COUNT_MAX {
            return Err(Error::BatchTooLarge {
                count: docs.len(),
                limit: DOC_CREATE_BATCH_COUNT_MAX,
            });
        }

        let mut state = self.state.write().await;
        let mut slot = state.slot_mut(scope)?;
        let owner = scope_owner(scope);

        let mut created = Vec::with_capacity(docs.len());
        for new_doc in docs {
            let mut id = self.io.gen_doc_id();
            while slot.contains(&id) {
                id = self.io.gen_doc_id();
            }
            let doc = new_doc.into_document(id, owner.clone());
            slot.insert(doc.clone());
            created.push(doc);
        }

        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        Ok(created)
    }

    #[instrument(skip(self), fields(scope = %scope))]
    async fn get(&self, scope: &Scope, id: &str) -> Result<Option<Document>> {
        self.stats.gets.fetch_add(1, Ordering::Relaxed);
        let state = self.state.read().await;
        Ok(state.slot(scope).and_then(|slot| slot.get(id)))
    }

    #[instrument(skip(self, doc), fields(scope = %scope, id = %doc.id))]
    async fn update(&self, scope: &Scope, doc: Document) -> Result<()> {
        let mut state = self.state.write().await;
        let mut slot = state.slot_mut(scope)?;
        let id = doc.id.clone();

        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        if slot.replace(doc) {
            Ok(())
        } else {
            Err(Error::document_not_found(id, scope))
        }
    }

    #[instrument(skip(self), fields(scope = %scope))]
    async fn delete(&self, scope: &Scope, id: &str) -> Result<Option<Document>> {
        let mut state = self.state.write().await;
        let removed = match state.slot_mut(scope) {
            Ok(mut slot) => slot.remove(id),
            Err(e) if e.is_miss() => None,
            Err(e) => return Err(e),
        };
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        Ok(removed)
    }

    #[instrument(skip(self), fields(scope = %scope))]
    async fn list(&self, scope: &Scope) -> Result<Vec<Document>> {
        let counter = match scope {
            Scope::Items | Scope::Actors => &self.stats.lists_world,
            Scope::Pack(_) => &self.stats.lists_pack,
            Scope::Inventory(_) => &self.stats.lists_inventory,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let state = self.state.read().await;
        Ok(state.slot(scope).map(|slot| slot.list()).unwrap_or_default())
    }

    async fn find_actor(&self, id: &str) -> Result<Option<Document>> {
        let state = self.state.read().await;
        Ok(state.actors.get(id).map(|h| h.doc.clone()))
    }

    async fn find_token(&self, id: &str) -> Result<Option<TokenInfo>> {
        let state = self.state.read().await;
        Ok(state.active_token(id).map(|t| t.info.clone()))
    }

    async fn find_library_actor(&self, id: &str) -> Result<Option<Document>> {
        let state = self.state.read().await;
        Ok(state
            .packs
            .values()
            .find_map(|p| p.docs.get(id))
            .map(|h| h.doc.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weapon(name: &str) -> NewDocument {
        NewDocument::new("mech_weapon", name, "icons/weapon.svg", json!({ "lid": name }))
    }

    fn pilot(name: &str) -> NewDocument {
        NewDocument::new("pilot", name, "icons/pilot.svg", json!({ "lid": name }))
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let store = MemoryStore::new();
        let created = store.create(&Scope::Items, vec![weapon("anvil")]).await.unwrap();
        let id = created[0].id.clone();
        assert_eq!(id.len(), machina_core::DOC_ID_LENGTH_CHARS);

        let doc = store.get(&Scope::Items, &id).await.unwrap().unwrap();
        assert_eq!(doc.name, "anvil");

        let renamed = Document {
            name: "Anvil Cannon".into(),
            ..doc
        };
        store.update(&Scope::Items, renamed).await.unwrap();
        assert_eq!(
            store.get(&Scope::Items, &id).await.unwrap().unwrap().name,
            "Anvil Cannon"
        );

        let removed = store.delete(&Scope::Items, &id).await.unwrap();
        assert_eq!(removed.unwrap().name, "Anvil Cannon");
        assert!(store.get(&Scope::Items, &id).await.unwrap().is_none());
        assert!(store.delete(&Scope::Items, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let doc = weapon("ghost").into_document("missing".into(), None);
        let err = store.update(&Scope::Items, doc).await.unwrap_err();
        assert!(err.is_miss());
    }

    #[tokio::test]
    async fn test_inventory_scoped_to_owner() {
        let store = MemoryStore::new();
        let actors = store.create(&Scope::Actors, vec![pilot("a"), pilot("b")]).await.unwrap();
        let a = Scope::Inventory(OwnerKey::Actor(actors[0].id.clone()));
        let b = Scope::Inventory(OwnerKey::Actor(actors[1].id.clone()));

        let created = store.create(&a, vec![weapon("knife")]).await.unwrap();
        assert_eq!(created[0].owner.as_deref(), Some(actors[0].id.as_str()));

        assert_eq!(store.list(&a).await.unwrap().len(), 1);
        assert!(store.list(&b).await.unwrap().is_empty());
        assert!(store.list(&Scope::Items).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inventory_of_missing_owner() {
        let store = MemoryStore::new();
        let scope = Scope::Inventory(OwnerKey::Actor("nobody".into()));
        assert!(store.list(&scope).await.unwrap().is_empty());
        let err = store.create(&scope, vec![weapon("x")]).await.unwrap_err();
        assert!(matches!(err, Error::OwnerNotFound { .. }));
    }

    #[tokio::test]
    async fn test_locked_pack_rejects_writes() {
        let store = MemoryStore::new();
        let pack = Scope::Pack("library.mech_weapon".into());
        store.create(&pack, vec![weapon("anvil")]).await.unwrap();
        store.set_pack_locked("library.mech_weapon", true).await;

        let err = store.create(&pack, vec![weapon("hammer")]).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { .. }));
        assert_eq!(store.list(&pack).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_token_reachable_only_on_active_scene() {
        let store = MemoryStore::new();
        let actors = store.create(&Scope::Actors, vec![pilot("ace")]).await.unwrap();
        let actor_id = actors[0].id.clone();
        store
            .create(
                &Scope::Inventory(OwnerKey::Actor(actor_id.clone())),
                vec![weapon("pistol")],
            )
            .await
            .unwrap();

        store.add_scene("s1", "Hangar").await;
        store.add_scene("s2", "Field").await;
        let token = store.spawn_token("s1", &actor_id).await.unwrap();

        assert!(store.find_token(&token.id).await.unwrap().is_none());
        store.set_active_scene(Some("s1")).await;
        assert_eq!(
            store.find_token(&token.id).await.unwrap().unwrap().actor_id,
            Some(actor_id.clone())
        );

        let inventory = Scope::Inventory(OwnerKey::Token(token.id.clone()));
        let items = store.list(&inventory).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].owner.as_deref(), Some(token.id.as_str()));

        store.set_active_scene(Some("s2")).await;
        assert!(store.list(&inventory).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_preserves_contents() {
        let store = MemoryStore::new();
        let actors = store.create(&Scope::Actors, vec![pilot("ace")]).await.unwrap();
        store
            .create(
                &Scope::Inventory(OwnerKey::Actor(actors[0].id.clone())),
                vec![weapon("pistol")],
            )
            .await
            .unwrap();
        store
            .create(&Scope::Pack("library.tag".into()), vec![weapon("tg")])
            .await
            .unwrap();

        let snapshot = store.snapshot().await;
        let restored = MemoryStore::from_snapshot(snapshot.clone(), IoContext::production());
        assert_eq!(restored.snapshot().await, snapshot);
    }

    #[tokio::test]
    async fn test_stats_count_listings() {
        let store = MemoryStore::new();
        store.list(&Scope::Pack("library.tag".into())).await.unwrap();
        store.list(&Scope::Items).await.unwrap();
        let stats = store.stats();
        assert_eq!(stats.lists_pack, 1);
        assert_eq!(stats.lists_world, 1);
    }
}
