//! Registry names
//!
//! TigerStyle: Names are a pure function of configuration.
//!
//! A name has two segments joined by `|`: the item backend, then the actor
//! backend. An owner-scoped item backend carries its owner id after `:`.
//!
//! ```text
//! world|world
//! library|library
//! world_inv:actor42|world
//! library_inv:actor7|library
//! token_inv:token3|world
//! ```

use machina_core::{
    Error, Result, DOC_ID_LENGTH_BYTES_MAX, REG_NAME_LENGTH_BYTES_MAX, REG_NAME_OWNER_DELIMITER,
    REG_NAME_SEGMENT_DELIMITER,
};
use machina_storage::OwnerKey;
use std::fmt;
use std::str::FromStr;

const WORLD: &str = "world";
const LIBRARY: &str = "library";
const WORLD_INV: &str = "world_inv";
const LIBRARY_INV: &str = "library_inv";
const TOKEN_INV: &str = "token_inv";

/// Where a registry keeps its items
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemSource {
    /// The world item collection
    World,
    /// Library packs
    Library,
    /// Inventory of a persistent world actor
    WorldInventory(String),
    /// Inventory of an actor stored in a library pack
    LibraryInventory(String),
    /// Inventory of a token on the active scene
    TokenInventory(String),
}

/// Where a registry keeps its actors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorSource {
    World,
    Library,
}

/// Backend configuration of a registry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegConfig {
    pub items: ItemSource,
    pub actors: ActorSource,
}

impl RegConfig {
    pub fn world() -> Self {
        Self {
            items: ItemSource::World,
            actors: ActorSource::World,
        }
    }

    pub fn library() -> Self {
        Self {
            items: ItemSource::Library,
            actors: ActorSource::Library,
        }
    }

    pub fn world_inventory(actor_id: impl Into<String>) -> Self {
        Self {
            items: ItemSource::WorldInventory(actor_id.into()),
            actors: ActorSource::World,
        }
    }

    pub fn library_inventory(actor_id: impl Into<String>) -> Self {
        Self {
            items: ItemSource::LibraryInventory(actor_id.into()),
            actors: ActorSource::Library,
        }
    }

    pub fn token_inventory(token_id: impl Into<String>) -> Self {
        Self {
            items: ItemSource::TokenInventory(token_id.into()),
            actors: ActorSource::World,
        }
    }

    /// Canonical name
    pub fn name(&self) -> String {
        let items = match &self.items {
            ItemSource::World => WORLD.to_string(),
            ItemSource::Library => LIBRARY.to_string(),
            ItemSource::WorldInventory(id) => owned(WORLD_INV, id),
            ItemSource::LibraryInventory(id) => owned(LIBRARY_INV, id),
            ItemSource::TokenInventory(id) => owned(TOKEN_INV, id),
        };
        let actors = match self.actors {
            ActorSource::World => WORLD,
            ActorSource::Library => LIBRARY,
        };
        format!("{}{}{}", items, REG_NAME_SEGMENT_DELIMITER, actors)
    }

    /// Parse a canonical name
    pub fn parse(name: &str) -> Result<Self> {
        if name.len() > REG_NAME_LENGTH_BYTES_MAX {
            return Err(Error::invalid_registry_name(
                truncated(name),
                format!("length {} exceeds {}", name.len(), REG_NAME_LENGTH_BYTES_MAX),
            ));
        }

        let (item_segment, actor_segment) = name
            .split_once(REG_NAME_SEGMENT_DELIMITER)
            .ok_or_else(|| Error::invalid_registry_name(name, "missing segment delimiter"))?;

        let actors = match actor_segment {
            WORLD => ActorSource::World,
            LIBRARY => ActorSource::Library,
            other => {
                return Err(Error::invalid_registry_name(
                    name,
                    format!("unknown actor backend '{}'", other),
                ))
            }
        };

        let items = match item_segment.split_once(REG_NAME_OWNER_DELIMITER) {
            None => match item_segment {
                WORLD => ItemSource::World,
                LIBRARY => ItemSource::Library,
                other => {
                    return Err(Error::invalid_registry_name(
                        name,
                        format!("unknown item backend '{}'", other),
                    ))
                }
            },
            Some((kind, owner)) => {
                validate_owner_id(name, owner)?;
                let owner = owner.to_string();
                match kind {
                    WORLD_INV => ItemSource::WorldInventory(owner),
                    LIBRARY_INV => ItemSource::LibraryInventory(owner),
                    TOKEN_INV => ItemSource::TokenInventory(owner),
                    other => {
                        return Err(Error::invalid_registry_name(
                            name,
                            format!("unknown inventory backend '{}'", other),
                        ))
                    }
                }
            }
        };

        Ok(Self { items, actors })
    }

    /// Owner whose inventory backs the items, if any
    pub fn owner(&self) -> Option<OwnerKey> {
        match &self.items {
            ItemSource::World | ItemSource::Library => None,
            ItemSource::WorldInventory(id) => Some(OwnerKey::Actor(id.clone())),
            ItemSource::LibraryInventory(id) => Some(OwnerKey::LibraryActor(id.clone())),
            ItemSource::TokenInventory(id) => Some(OwnerKey::Token(id.clone())),
        }
    }
}

impl fmt::Display for RegConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for RegConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn owned(kind: &str, id: &str) -> String {
    format!("{}{}{}", kind, REG_NAME_OWNER_DELIMITER, id)
}

fn validate_owner_id(name: &str, owner: &str) -> Result<()> {
    if owner.is_empty() {
        return Err(Error::invalid_registry_name(name, "empty owner id"));
    }
    if owner.len() > DOC_ID_LENGTH_BYTES_MAX {
        return Err(Error::invalid_registry_name(
            name,
            format!("owner id exceeds {} bytes", DOC_ID_LENGTH_BYTES_MAX),
        ));
    }
    if owner.contains(REG_NAME_OWNER_DELIMITER) {
        return Err(Error::invalid_registry_name(name, "owner id contains ':'"));
    }
    Ok(())
}

fn truncated(name: &str) -> String {
    name.chars().take(32).collect::<String>() + "..."
}
