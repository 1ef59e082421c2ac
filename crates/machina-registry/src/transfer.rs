//! Ownership transfer
//!
//! The user-visible "move": insinuate into the destination, then delete the
//! source when asked to.

use crate::ctx::OpCtx;
use crate::error::RegistryResult;
use crate::insinuate::{insinuate_one, InsinuationHooks, Insinuated};
use crate::live::LiveEntity;
use crate::registry::Registry;
use std::sync::Arc;
use tracing::info;

/// Give `destination` its own copy of `entity`, optionally removing the source
///
/// An entity already owned by the destination is left in place and never
/// deleted.
pub async fn take_ownership(
    entity: Arc<LiveEntity>,
    destination: &Registry,
    ctx: &OpCtx,
    hooks: &dyn InsinuationHooks,
    delete_source: bool,
) -> RegistryResult<Insinuated> {
    let source = entity.registry().clone();
    let source_id = entity.id().to_string();
    let category = entity.category();

    let result = insinuate_one(entity, destination, ctx, hooks).await?;

    if result.is_new && delete_source {
        source.get_cat(category).delete_id(&source_id).await?;
        if category.is_actor() {
            source.env().registry_cache().invalidate_owner(&source_id);
        }
        info!(id = %source_id, registry = %source.name(), "source removed after transfer");
    }
    Ok(result)
}
