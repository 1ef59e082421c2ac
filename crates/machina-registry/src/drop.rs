//! Drop payloads
//!
//! TigerStyle: Explicit discriminant at the serialization boundary.
//!
//! A dropped payload is either one of our references or a pointer to a host
//! document in host terms (world item, pack entry, actor or token inventory
//! item). The `kind` field says which; nothing is inferred from shape.
//!
//! [`DropResolver`] answers "what is this?" through the async fetch cache so
//! that drag-over checks can be answered synchronously.

use crate::ctx::OpCtx;
use crate::env::RegistryEnv;
use crate::fetch_cache::{FetchCache, Fetched};
use crate::live::LiveEntity;
use crate::model::Category;
use crate::name::RegConfig;
use crate::reference::RegRef;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Host document class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Item,
    Actor,
}

/// A host document pointer as the host would describe it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostDocument {
    pub document_kind: DocumentKind,
    pub id: String,
    /// Library pack holding the document or its owning actor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack: Option<String>,
    /// Owning actor, for inventory items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Owning token on the active scene, for token inventory items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

impl HostDocument {
    /// Registry that physically holds the document
    pub fn registry_config(&self) -> RegConfig {
        match (&self.token_id, &self.actor_id, &self.pack) {
            (Some(token), _, _) => RegConfig::token_inventory(token.clone()),
            (None, Some(actor), Some(_)) => RegConfig::library_inventory(actor.clone()),
            (None, Some(actor), None) => RegConfig::world_inventory(actor.clone()),
            (None, None, Some(_)) => RegConfig::library(),
            (None, None, None) => RegConfig::world(),
        }
    }
}

/// Payload of a drag-and-drop
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropPayload {
    Ref(RegRef),
    Document(HostDocument),
}

impl DropPayload {
    /// The reference this payload denotes
    pub fn to_ref(&self) -> RegRef {
        match self {
            Self::Ref(r) => r.clone(),
            Self::Document(doc) => RegRef {
                id: doc.id.clone(),
                category: None,
                registry_name: doc.registry_config().name(),
                fallback_key: String::new(),
            },
        }
    }
}

/// What a payload resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct DropSummary {
    /// Canonical reference to the resolved document
    pub reference: RegRef,
    pub category: Category,
    pub name: String,
}

/// Resolves drop payloads, caching answers for synchronous checks
pub struct DropResolver {
    env: Arc<RegistryEnv>,
    cache: FetchCache<DropPayload, Option<DropSummary>>,
}

impl DropResolver {
    pub fn new(env: Arc<RegistryEnv>) -> Self {
        let timeout_ms = env.config().cache.fetch_timeout_ms;
        let time = env.io().time.clone();
        let fetch_env = env.clone();
        let cache = FetchCache::new(timeout_ms, time, move |payload: DropPayload| {
            let env = fetch_env.clone();
            async move { summarize(&env, &payload).await }
        });
        Self { env, cache }
    }

    /// Resolve a payload, sharing any in-flight lookup
    pub async fn resolve(&self, payload: &DropPayload) -> Option<DropSummary> {
        self.cache.fetch(payload.clone()).await
    }

    /// Answer immediately if known, otherwise start resolving
    pub fn sync_check(&self, payload: &DropPayload) -> Fetched<Option<DropSummary>> {
        self.cache.sync_fetch(payload.clone())
    }

    /// Whether a drop of `payload` onto a slot taking `allowed` should be offered
    ///
    /// Unknown answers are permissive; the drop itself resolves for real.
    pub fn accepts(&self, payload: &DropPayload, allowed: &[Category]) -> bool {
        match self.sync_check(payload) {
            Fetched::Pending => true,
            Fetched::Ready(Some(summary)) => allowed.contains(&summary.category),
            Fetched::Ready(None) => false,
        }
    }

    /// Revive the payload's target, bypassing the cache
    pub async fn resolve_live(&self, ctx: &OpCtx, payload: &DropPayload) -> Option<Arc<LiveEntity>> {
        self.env.world().resolve(ctx, &payload.to_ref()).await
    }

    /// Forget a cached answer after the target changed
    pub fn flush(&self, payload: &DropPayload) {
        self.cache.flush(payload);
    }

    pub fn flush_all(&self) {
        self.cache.flush_all();
    }
}

async fn summarize(env: &Arc<RegistryEnv>, payload: &DropPayload) -> Option<DropSummary> {
    let reference = payload.to_ref();
    let resolved = env.world().resolve_to_document(&reference).await?;
    let category = resolved.entry.category();
    if let DropPayload::Document(doc) = payload {
        if (doc.document_kind == DocumentKind::Actor) != category.is_actor() {
            debug!(id = %doc.id, category = %category, "host document kind does not match record");
            return None;
        }
    }
    debug!(id = %resolved.entry.id, category = %category, "drop payload resolved");
    Some(DropSummary {
        reference: RegRef::new(
            resolved.entry.id.clone(),
            category,
            resolved.registry.name(),
            resolved.entry.raw.lid(),
        ),
        category,
        name: resolved.entry.doc.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ref_payload_is_tagged() {
        let payload = DropPayload::Ref(RegRef::new("w1", Category::MechWeapon, "library|library", ""));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["kind"], "ref");
        assert_eq!(value["registry_name"], "library|library");
        assert_eq!(serde_json::from_value::<DropPayload>(value).unwrap(), payload);
    }

    #[test]
    fn test_document_payload_parses() {
        let payload: DropPayload = serde_json::from_value(json!({
            "kind": "document",
            "document_kind": "item",
            "id": "i1",
            "actor_id": "a1"
        }))
        .unwrap();
        assert_eq!(payload.to_ref().registry_name, "world_inv:a1|world");
        assert_eq!(payload.to_ref().category, None);
    }

    #[test]
    fn test_untagged_payload_rejected() {
        let result = serde_json::from_value::<DropPayload>(json!({
            "id": "w1",
            "category": "mech_weapon",
            "registry_name": "world|world",
            "fallback_key": ""
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_host_document_locations() {
        let doc = |pack: Option<&str>, actor: Option<&str>, token: Option<&str>| HostDocument {
            document_kind: DocumentKind::Item,
            id: "x".into(),
            pack: pack.map(String::from),
            actor_id: actor.map(String::from),
            token_id: token.map(String::from),
        };
        assert_eq!(doc(None, None, None).registry_config().name(), "world|world");
        assert_eq!(
            doc(Some("library.tag"), None, None).registry_config().name(),
            "library|library"
        );
        assert_eq!(
            doc(Some("library.pilot"), Some("a1"), None).registry_config().name(),
            "library_inv:a1|library"
        );
        assert_eq!(doc(None, Some("a1"), Some("t1")).registry_config().name(), "token_inv:t1|world");
    }
}
