//! Collection wrappers
//!
//! TigerStyle: One small backend per storage location behind one trait.
//!
//! A wrapper adapts a single category in a single physical location to a
//! uniform create/get/update/destroy/enumerate contract. Documents of another
//! category found in the same location are treated as absent.

mod inventory;
mod library;
mod token;
mod world;

pub use inventory::InventoryCollection;
pub use library::{LibraryCollection, LibraryIndex};
pub use token::TokenInventoryCollection;
pub use world::WorldCollection;

use crate::error::RegistryResult;
use crate::model::{Category, RawData};
use async_trait::async_trait;
use machina_storage::{Document, DocumentStore, NewDocument, Scope};
use tracing::warn;

/// Location and display metadata of the document backing an entity
#[derive(Debug, Clone, PartialEq)]
pub struct DocMeta {
    pub id: String,
    pub name: String,
    pub img: String,
    pub owner: Option<String>,
    pub scope: Scope,
}

/// A record as held by a wrapper
#[derive(Debug, Clone, PartialEq)]
pub struct RegEntry {
    pub id: String,
    pub raw: RawData,
    pub doc: DocMeta,
}

impl RegEntry {
    pub fn category(&self) -> Category {
        self.raw.category()
    }
}

/// CRUD + enumerate over one category in one location
#[async_trait]
pub trait CollectionWrapper: Send + Sync {
    /// Category this wrapper manages
    fn category(&self) -> Category;

    /// Physical location of the documents
    fn scope(&self) -> Scope;

    /// Persist new records, returning them with their assigned ids
    async fn create(&self, raws: Vec<RawData>) -> RegistryResult<Vec<RegEntry>>;

    /// Fetch one record; `None` when absent or of another category
    async fn get(&self, id: &str) -> RegistryResult<Option<RegEntry>>;

    /// Write records back
    ///
    /// Entries whose id no longer exists are logged and skipped.
    async fn update(&self, entries: Vec<RegEntry>) -> RegistryResult<()>;

    /// Delete a record, returning its last stored form
    async fn destroy(&self, id: &str) -> RegistryResult<Option<RawData>>;

    /// Every record of this category in this location
    async fn enumerate(&self) -> RegistryResult<Vec<RegEntry>>;
}

// =============================================================================
// Document conversion
// =============================================================================

/// Interpret a stored document as an entry of `category`
///
/// Category mismatches and undecodable payloads are misses.
pub(crate) fn entry_from_doc(category: Category, scope: &Scope, doc: Document) -> Option<RegEntry> {
    if doc.doc_type != category.as_str() {
        return None;
    }
    match RawData::from_parts(category, doc.data) {
        Ok(raw) => Some(RegEntry {
            id: doc.id.clone(),
            raw,
            doc: DocMeta {
                id: doc.id,
                name: doc.name,
                img: doc.img,
                owner: doc.owner,
                scope: scope.clone(),
            },
        }),
        Err(e) => {
            warn!(id = %doc.id, category = %category, error = %e, "undecodable record treated as absent");
            None
        }
    }
}

pub(crate) fn new_document(raw: &RawData) -> RegistryResult<NewDocument> {
    let category = raw.category();
    Ok(NewDocument::new(
        category.as_str(),
        raw.name(),
        category.default_img(),
        raw.to_value()?,
    ))
}

pub(crate) fn entry_to_document(entry: &RegEntry) -> RegistryResult<Document> {
    Ok(Document {
        id: entry.id.clone(),
        name: entry.doc.name.clone(),
        img: entry.doc.img.clone(),
        doc_type: entry.category().as_str().to_string(),
        data: entry.raw.to_value()?,
        owner: entry.doc.owner.clone(),
    })
}

/// Shared create path for wrappers that address a fixed scope
pub(crate) async fn create_in(
    store: &dyn DocumentStore,
    category: Category,
    scope: &Scope,
    raws: Vec<RawData>,
) -> RegistryResult<Vec<RegEntry>> {
    let docs = raws
        .iter()
        .map(new_document)
        .collect::<RegistryResult<Vec<_>>>()?;
    let created = store.create(scope, docs).await?;
    Ok(created
        .into_iter()
        .filter_map(|doc| entry_from_doc(category, scope, doc))
        .collect())
}

/// Shared update path: misses are logged and dropped, other failures propagate
///
/// A stored document of another category is a miss. Returns the entries
/// actually written.
pub(crate) async fn update_in(
    store: &dyn DocumentStore,
    category: Category,
    scope: &Scope,
    entries: Vec<RegEntry>,
) -> RegistryResult<Vec<RegEntry>> {
    let mut written = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.category() != category {
            warn!(id = %entry.id, expected = %category, found = %entry.category(), "update with record of another category dropped");
            continue;
        }
        match store.get(scope, &entry.id).await? {
            Some(stored) if stored.doc_type == category.as_str() => {}
            Some(stored) => {
                warn!(id = %entry.id, scope = %scope, expected = %category, found = %stored.doc_type, "update of record of another category dropped");
                continue;
            }
            None => {
                warn!(id = %entry.id, scope = %scope, "update of missing record dropped");
                continue;
            }
        }
        let doc = entry_to_document(&entry)?;
        match store.update(scope, doc).await {
            Ok(()) => written.push(entry),
            Err(e) if e.is_miss() => {
                warn!(id = %entry.id, scope = %scope, "update of missing record dropped");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(written)
}

pub(crate) async fn get_in(
    store: &dyn DocumentStore,
    category: Category,
    scope: &Scope,
    id: &str,
) -> RegistryResult<Option<RegEntry>> {
    Ok(store
        .get(scope, id)
        .await?
        .and_then(|doc| entry_from_doc(category, scope, doc)))
}

pub(crate) async fn destroy_in(
    store: &dyn DocumentStore,
    category: Category,
    scope: &Scope,
    id: &str,
) -> RegistryResult<Option<RawData>> {
    // Only delete documents this wrapper would have returned from get
    if get_in(store, category, scope, id).await?.is_none() {
        return Ok(None);
    }
    Ok(store
        .delete(scope, id)
        .await?
        .and_then(|doc| entry_from_doc(category, scope, doc))
        .map(|entry| entry.raw))
}

pub(crate) async fn enumerate_in(
    store: &dyn DocumentStore,
    category: Category,
    scope: &Scope,
) -> RegistryResult<Vec<RegEntry>> {
    Ok(store
        .list(scope)
        .await?
        .into_iter()
        .filter_map(|doc| entry_from_doc(category, scope, doc))
        .collect())
}
