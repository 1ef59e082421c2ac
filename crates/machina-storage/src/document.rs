//! Host document shapes and addressing
//!
//! TigerStyle: Every document carries id, display name, image, and type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A physical document as the host stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable host id
    pub id: String,
    /// Display name
    pub name: String,
    /// Display image path
    #[serde(default)]
    pub img: String,
    /// Document type tag (the category name)
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Raw payload
    #[serde(default)]
    pub data: serde_json::Value,
    /// Owning actor or token id, for inventory documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// A document to be created; the store assigns id and owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub img: String,
    pub doc_type: String,
    pub data: serde_json::Value,
}

impl NewDocument {
    /// Create a new document description
    pub fn new(
        doc_type: impl Into<String>,
        name: impl Into<String>,
        img: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            img: img.into(),
            doc_type: doc_type.into(),
            data,
        }
    }

    pub(crate) fn into_document(self, id: String, owner: Option<String>) -> Document {
        Document {
            id,
            name: self.name,
            img: self.img,
            doc_type: self.doc_type,
            data: self.data,
            owner,
        }
    }
}

/// The entity owning an embedded inventory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerKey {
    /// A persistent world actor
    Actor(String),
    /// A token on the active scene
    Token(String),
    /// An actor stored in a library pack
    LibraryActor(String),
}

impl OwnerKey {
    /// The owner's id
    pub fn id(&self) -> &str {
        match self {
            Self::Actor(id) | Self::Token(id) | Self::LibraryActor(id) => id,
        }
    }

    /// Short kind label used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Actor(_) => "actor",
            Self::Token(_) => "token",
            Self::LibraryActor(_) => "library_actor",
        }
    }
}

/// A physical collection in the host store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// World-level items
    Items,
    /// World-level actors
    Actors,
    /// A library pack by name
    Pack(String),
    /// An inventory embedded in an owner
    Inventory(OwnerKey),
}

impl Scope {
    /// Short kind label used in logs and statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Actors => "actors",
            Self::Pack(_) => "pack",
            Self::Inventory(_) => "inventory",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Items => write!(f, "items"),
            Self::Actors => write!(f, "actors"),
            Self::Pack(name) => write!(f, "pack {}", name),
            Self::Inventory(owner) => write!(f, "{} {} inventory", owner.kind(), owner.id()),
        }
    }
}

/// A token placed on the active scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub img: String,
    pub scene_id: String,
    /// The persistent actor the token was spawned from, if any
    #[serde(default)]
    pub actor_id: Option<String>,
}
