//! Insinuation
//!
//! TigerStyle: Copy semantics only. The source is never modified.
//!
//! Insinuating an entity into a destination registry yields an equivalent
//! entity physically owned by the destination. Entities already owned there
//! come back unchanged and flagged not new. Actors carry their owned
//! dependents (equipment, frame, licenses...) along: each child is insinuated
//! into the new actor's inventory first, and the copy's references are
//! rewritten to the new children before the final write.

use crate::collection::{DocMeta, RegEntry};
use crate::ctx::OpCtx;
use crate::error::{RegistryError, RegistryResult};
use crate::live::LiveEntity;
use crate::registry::Registry;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use machina_core::INSINUATION_DEPTH_MAX;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of insinuating one entity
#[derive(Debug, Clone)]
pub struct Insinuated {
    pub entity: Arc<LiveEntity>,
    /// Whether a new record was created
    pub is_new: bool,
}

/// Reconciliation points around the final write of a copy
#[async_trait]
pub trait InsinuationHooks: Send + Sync {
    /// Adjust the destination entry before it is written for the last time
    ///
    /// By default the source document's display name and image carry over.
    async fn pre_final_write(&self, source: &DocMeta, destination: &mut RegEntry) -> RegistryResult<()> {
        destination.doc.name = source.name.clone();
        destination.doc.img = source.img.clone();
        Ok(())
    }

    /// Follow-up on the revived result
    ///
    /// By default new copies get their consumable uses refilled.
    async fn post_insinuate(&self, result: &Insinuated) -> RegistryResult<()> {
        if result.is_new && result.entity.modify(|raw| raw.refill_uses()).await {
            result.entity.save().await?;
        }
        Ok(())
    }
}

/// Hooks with the default behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl InsinuationHooks for DefaultHooks {}

/// Copy `entities` into `destination`
///
/// Results are in input order. The first failure aborts the remaining
/// entities; copies already made are kept.
pub async fn insinuate(
    entities: &[Arc<LiveEntity>],
    destination: &Registry,
    ctx: &OpCtx,
    hooks: &dyn InsinuationHooks,
) -> RegistryResult<Vec<Insinuated>> {
    let mut results = Vec::with_capacity(entities.len());
    for entity in entities {
        results.push(insinuate_one(entity.clone(), destination, ctx, hooks).await?);
    }
    Ok(results)
}

/// Copy a single entity into `destination`
pub async fn insinuate_one(
    entity: Arc<LiveEntity>,
    destination: &Registry,
    ctx: &OpCtx,
    hooks: &dyn InsinuationHooks,
) -> RegistryResult<Insinuated> {
    copy_into(entity, destination, ctx, hooks, 0).await
}

fn copy_into<'a>(
    entity: Arc<LiveEntity>,
    destination: &'a Registry,
    ctx: &'a OpCtx,
    hooks: &'a dyn InsinuationHooks,
    depth: usize,
) -> BoxFuture<'a, RegistryResult<Insinuated>> {
    async move {
        let category = entity.category();
        let source_doc = entity.doc().await;
        let collection = destination.get_cat(category);

        // Residency is physical: registries differing only in a backend this
        // category does not use share the same collection
        if source_doc.scope == collection.scope() {
            debug!(id = %entity.id(), registry = %destination.name(), scope = %source_doc.scope, "already resident");
            return Ok(Insinuated {
                entity,
                is_new: false,
            });
        }
        if !entity.is_ready() {
            return Err(RegistryError::insinuation_failed(
                entity.id(),
                destination.name(),
                "entity is still hydrating",
            ));
        }
        if depth > INSINUATION_DEPTH_MAX {
            return Err(RegistryError::InsinuationTooDeep {
                depth,
                max: INSINUATION_DEPTH_MAX,
            });
        }

        let raw = entity.raw().await;

        let mut entry = collection
            .create_many_raw(vec![raw.clone()])
            .await?
            .pop()
            .ok_or_else(|| {
                RegistryError::insinuation_failed(entity.id(), destination.name(), "no record created")
            })?;

        let finished = async {
            if let Some(inventory) = destination.inventory_of(category, &entry.id) {
                let mut rewrites = HashMap::new();
                for slot in raw.child_slots() {
                    let Some(child) = entity.link(&slot.path) else {
                        debug!(id = %entity.id(), path = %slot.path, "unresolved dependent kept as is");
                        continue;
                    };
                    let copied = copy_into(child, &inventory, ctx, hooks, depth + 1).await?;
                    rewrites.insert(slot.path, copied.entity.reg_ref());
                }
                for (path, reference) in entry.raw.refs_mut() {
                    if let Some(rewritten) = rewrites.remove(&path) {
                        *reference = rewritten;
                    }
                }
            }

            hooks.pre_final_write(&source_doc, &mut entry).await?;
            collection.update_raw(vec![entry.clone()]).await
        }
        .await;

        if let Err(e) = finished {
            warn!(id = %entry.id, registry = %destination.name(), error = %e, "insinuation failed; removing partial copy");
            if let Err(cleanup) = collection.delete_id(&entry.id).await {
                warn!(id = %entry.id, error = %cleanup, "partial copy not removed");
            }
            return Err(e);
        }

        let revived = collection.revive_entry(ctx, entry).await;
        let result = Insinuated {
            entity: revived,
            is_new: true,
        };
        hooks.post_insinuate(&result).await?;

        info!(
            source = %entity.id(),
            copy = %result.entity.id(),
            category = %category,
            destination = %destination.name(),
            "entity insinuated"
        );
        Ok(result)
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::RegistryEnv;
    use crate::model::{Category, RawData};
    use machina_core::{IoContext, MachinaConfig};
    use machina_storage::MemoryStore;

    #[tokio::test]
    async fn test_entity_still_hydrating_is_refused() {
        let env = RegistryEnv::new(
            Arc::new(MemoryStore::new()),
            IoContext::production(),
            MachinaConfig::default(),
        );
        let world = env.world();
        let entry = world
            .get_cat(Category::PilotGear)
            .create_many_raw(vec![RawData::default_for(Category::PilotGear)])
            .await
            .unwrap()
            .remove(0);
        let pending = Arc::new(LiveEntity::placeholder(world.clone(), entry));
        assert!(!pending.is_ready());

        let library = env.library();
        let ctx = OpCtx::new();
        let err = insinuate_one(pending, &library, &ctx, &DefaultHooks)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InsinuationFailed { .. }));
        assert!(library
            .get_cat(Category::PilotGear)
            .raw_map()
            .await
            .unwrap()
            .is_empty());
    }
}
