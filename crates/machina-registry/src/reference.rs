//! Serializable entity references
//!
//! TigerStyle: Storage-independent pointers with an explicit fallback.
//!
//! A `RegRef` names its target by id within a registry and category. When the
//! id no longer resolves, the fallback key (a stable rules id or display name)
//! is tried before giving up.

use crate::collection::RegEntry;
use crate::model::Category;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pointer to an entity possibly stored in another registry
///
/// Always serialized in the four-field form
/// `{ id, category, registry_name, fallback_key }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegRef {
    /// Document id within the registry and category; empty while under construction
    pub id: String,
    /// Category of the target, `null` when unknown
    #[serde(default)]
    pub category: Option<Category>,
    /// Canonical name of the registry that physically owns the target
    pub registry_name: String,
    /// Secondary lookup key, empty for none
    #[serde(default)]
    pub fallback_key: String,
}

impl RegRef {
    /// Create a fully specified reference
    pub fn new(
        id: impl Into<String>,
        category: Category,
        registry_name: impl Into<String>,
        fallback_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: Some(category),
            registry_name: registry_name.into(),
            fallback_key: fallback_key.into(),
        }
    }

    /// Reference a stored entry of `registry`, falling back to its lid
    pub fn to(entry: &RegEntry, registry: &Registry) -> Self {
        Self::new(
            entry.id.clone(),
            entry.category(),
            registry.name(),
            entry.raw.lid(),
        )
    }

    /// Reference a rules entity by its stable id only
    ///
    /// Used for template content (tags, licenses) that is looked up in the
    /// library by lid rather than by document id.
    pub fn by_lid(
        category: Category,
        lid: impl Into<String>,
        registry_name: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            category: Some(category),
            registry_name: registry_name.into(),
            fallback_key: lid.into(),
        }
    }

    /// Whether resolution has anything to work with
    pub fn is_resolvable(&self) -> bool {
        !self.id.is_empty() || !self.fallback_key.is_empty()
    }

    /// Whether a fallback key is present
    pub fn has_fallback(&self) -> bool {
        !self.fallback_key.is_empty()
    }
}

impl fmt::Display for RegRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let category = self.category.map(|c| c.as_str()).unwrap_or("*");
        if self.id.is_empty() {
            write!(f, "{}:~{}@{}", category, self.fallback_key, self.registry_name)
        } else {
            write!(f, "{}:{}@{}", category, self.id, self.registry_name)
        }
    }
}
