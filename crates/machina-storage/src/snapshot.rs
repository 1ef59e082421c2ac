//! JSON world snapshots
//!
//! Seed data for `MemoryStore` and the on-disk format the CLI reads and writes.

use crate::document::Document;
use machina_core::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A document together with its embedded inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderSnapshot {
    #[serde(flatten)]
    pub doc: Document,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Document>,
}

impl From<Document> for HolderSnapshot {
    fn from(doc: Document) -> Self {
        Self {
            doc,
            items: Vec::new(),
        }
    }
}

/// A library pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackSnapshot {
    pub name: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub documents: Vec<HolderSnapshot>,
}

/// A token and its synthetic inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub img: String,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub items: Vec<Document>,
}

/// A scene and its tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tokens: Vec<TokenSnapshot>,
}

/// Complete contents of a host world
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub items: Vec<Document>,
    #[serde(default)]
    pub actors: Vec<HolderSnapshot>,
    #[serde(default)]
    pub packs: Vec<PackSnapshot>,
    #[serde(default)]
    pub scenes: Vec<SceneSnapshot>,
    #[serde(default)]
    pub active_scene: Option<String>,
}

impl WorldSnapshot {
    /// Read a snapshot from a JSON file
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the snapshot to a JSON file
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holder_flattens_document() {
        let json = r#"{
            "id": "actor42",
            "name": "Ace",
            "type": "pilot",
            "data": {"lid": "pilot_ace"},
            "items": [{"id": "w1", "name": "Pistol", "type": "pilot_gear", "owner": "actor42"}]
        }"#;
        let holder: HolderSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(holder.doc.id, "actor42");
        assert_eq!(holder.doc.doc_type, "pilot");
        assert_eq!(holder.items.len(), 1);
        assert_eq!(holder.items[0].owner.as_deref(), Some("actor42"));
    }

    #[test]
    fn test_empty_snapshot_from_empty_object() {
        let snapshot: WorldSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, WorldSnapshot::default());
    }
}
