//! Per-category registry access
//!
//! [`CatReg`] pairs a registry with one category's wrapper and adds the live
//! operations on top of the raw wrapper contract. Read paths used while
//! rendering degrade store failures to absence with a warning; write paths
//! return errors.

use crate::collection::{entry_from_doc, CollectionWrapper, RegEntry};
use crate::ctx::OpCtx;
use crate::error::{RegistryError, RegistryResult};
use crate::live::{revive, settle, HydrationChain, LiveEntity};
use crate::model::{Category, RawData};
use crate::registry::Registry;
use machina_storage::{Document, Scope};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, warn};

/// Accessor for one category of one registry
pub struct CatReg<'a> {
    registry: &'a Registry,
    category: Category,
    wrapper: &'a Arc<dyn CollectionWrapper>,
}

impl<'a> CatReg<'a> {
    pub(crate) fn new(
        registry: &'a Registry,
        category: Category,
        wrapper: &'a Arc<dyn CollectionWrapper>,
    ) -> Self {
        debug_assert_eq!(wrapper.category(), category);
        Self {
            registry,
            category,
            wrapper,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Physical collection this category is stored in
    pub fn scope(&self) -> Scope {
        self.wrapper.scope()
    }

    // =========================================================================
    // Raw access
    // =========================================================================

    pub async fn get_raw(&self, id: &str) -> RegistryResult<Option<RawData>> {
        Ok(self.wrapper.get(id).await?.map(|entry| entry.raw))
    }

    /// Entry by id; store failures read as absence
    pub async fn get_entry(&self, id: &str) -> Option<RegEntry> {
        match self.wrapper.get(id).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(id, category = %self.category, registry = %self.registry.name(), error = %e, "read failed");
                None
            }
        }
    }

    /// Every raw record keyed by id
    pub async fn raw_map(&self) -> RegistryResult<BTreeMap<String, RawData>> {
        Ok(self
            .wrapper
            .enumerate()
            .await?
            .into_iter()
            .map(|entry| (entry.id, entry.raw))
            .collect())
    }

    pub async fn create_many_raw(&self, raws: Vec<RawData>) -> RegistryResult<Vec<RegEntry>> {
        if let Some(bad) = raws.iter().find(|raw| raw.category() != self.category) {
            error!(expected = %self.category, found = %bad.category(), "record category does not match collection");
            return Err(RegistryError::CreateFailed {
                category: self.category.to_string(),
                reason: format!("record of category {}", bad.category()),
            });
        }
        let count = raws.len();
        let created = self.wrapper.create(raws).await?;
        if created.len() != count {
            return Err(RegistryError::CreateFailed {
                category: self.category.to_string(),
                reason: format!("store returned {} of {} records", created.len(), count),
            });
        }
        Ok(created)
    }

    /// Write records back; missing ids are logged and skipped
    pub async fn update_raw(&self, entries: Vec<RegEntry>) -> RegistryResult<()> {
        self.wrapper.update(entries).await
    }

    pub async fn delete_id(&self, id: &str) -> RegistryResult<Option<RawData>> {
        self.wrapper.destroy(id).await
    }

    /// First record matching `predicate`, by linear scan
    pub async fn lookup_raw<F>(&self, predicate: F) -> RegistryResult<Option<RegEntry>>
    where
        F: Fn(&RawData) -> bool + Send,
    {
        Ok(self
            .wrapper
            .enumerate()
            .await?
            .into_iter()
            .find(|entry| predicate(&entry.raw)))
    }

    /// Record whose stable id, or failing that display name, equals `key`
    pub async fn lookup_by_key(&self, key: &str) -> Option<RegEntry> {
        let entries = match self.wrapper.enumerate().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(key, category = %self.category, error = %e, "fallback scan failed");
                return None;
            }
        };
        let by_lid = entries.iter().position(|e| e.raw.lid() == key);
        let index = by_lid.or_else(|| entries.iter().position(|e| e.raw.name() == key))?;
        entries.into_iter().nth(index)
    }

    // =========================================================================
    // Live access
    // =========================================================================

    /// Revive the record `id` under `ctx`
    pub async fn get_live(&self, ctx: &OpCtx, id: &str) -> Option<Arc<LiveEntity>> {
        if let Some(existing) = ctx.get(id) {
            if existing.category() == self.category {
                return Some(settle(existing, &HydrationChain::root()).await);
            }
        }
        let entry = self.get_entry(id).await?;
        Some(self.revive_entry(ctx, entry).await)
    }

    /// Revive every record of this category
    pub async fn list_live(&self, ctx: &OpCtx) -> Vec<Arc<LiveEntity>> {
        let entries = match self.wrapper.enumerate().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(category = %self.category, registry = %self.registry.name(), error = %e, "listing failed");
                return Vec::new();
            }
        };
        let mut live = Vec::with_capacity(entries.len());
        for entry in entries {
            live.push(self.revive_entry(ctx, entry).await);
        }
        live
    }

    pub async fn create_many_live(
        &self,
        ctx: &OpCtx,
        raws: Vec<RawData>,
    ) -> RegistryResult<Vec<Arc<LiveEntity>>> {
        let created = self.create_many_raw(raws).await?;
        let mut live = Vec::with_capacity(created.len());
        for entry in created {
            live.push(self.revive_entry(ctx, entry).await);
        }
        Ok(live)
    }

    /// Create and revive one blank record
    pub async fn create_default(&self, ctx: &OpCtx) -> RegistryResult<Arc<LiveEntity>> {
        let mut created = self
            .create_many_live(ctx, vec![RawData::default_for(self.category)])
            .await?;
        created.pop().ok_or_else(|| RegistryError::CreateFailed {
            category: self.category.to_string(),
            reason: "no record returned".into(),
        })
    }

    /// Revive a document the caller already holds, skipping the id lookup
    pub async fn wrap_doc(&self, ctx: &OpCtx, doc: Document) -> Option<Arc<LiveEntity>> {
        let id = doc.id.clone();
        let doc_type = doc.doc_type.clone();
        match entry_from_doc(self.category, &self.wrapper.scope(), doc) {
            Some(entry) => Some(self.revive_entry(ctx, entry).await),
            None => {
                error!(id, doc_type, category = %self.category, "document cannot be wrapped by this collection");
                None
            }
        }
    }

    pub(crate) async fn revive_entry(&self, ctx: &OpCtx, entry: RegEntry) -> Arc<LiveEntity> {
        let chain = HydrationChain::root();
        revive(self.registry, ctx, entry, &chain).await
    }
}
