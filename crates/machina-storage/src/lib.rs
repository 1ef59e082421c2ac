//! Machina Storage
//!
//! The host document store that machina registries sit on top of.
//!
//! # Overview
//!
//! The host application owns the physical documents; this crate specifies
//! that boundary as the [`DocumentStore`] trait and provides an in-memory
//! implementation:
//! - World collections of items and actors
//! - Inventories embedded in actors, in tokens on the active scene, and in
//!   library actors
//! - Library packs, one per category, optionally locked against writes
//!
//! `MemoryStore` can be seeded from and saved to a JSON [`WorldSnapshot`].

pub mod document;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use document::{Document, NewDocument, OwnerKey, Scope, TokenInfo};
pub use memory::{MemoryStore, StoreStats};
pub use snapshot::{HolderSnapshot, PackSnapshot, SceneSnapshot, TokenSnapshot, WorldSnapshot};
pub use store::DocumentStore;
