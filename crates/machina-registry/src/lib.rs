//! Machina Registry
//!
//! Entity registry and live-object resolution over the host document store.
//!
//! # Overview
//!
//! - [`Registry`]: one collection wrapper per category over one storage
//!   location, named by a string that [`RegistryEnv::switch_reg`] can turn
//!   back into a registry
//! - [`RegRef`]: serializable pointer to an entity, with a fallback key
//! - [`OpCtx`] and [`LiveEntity`]: per-operation hydration with cycle safety
//! - [`insinuate`]: copy entities (and their owned dependents) between registries
//! - [`FetchCache`]: coalescing TTL cache for synchronous-looking async lookups
//!
//! # Example
//!
//! ```rust,ignore
//! let env = RegistryEnv::new(store, IoContext::production(), MachinaConfig::default());
//! let ctx = env.new_ctx();
//! let reg = env.switch_reg("world_inv:actor42|world").await?;
//! let weapons = reg.get_cat(Category::MechWeapon).list_live(&ctx).await;
//! ```

mod accessor;
mod cache;
pub mod collection;
mod ctx;
mod drop;
mod env;
mod error;
mod fetch_cache;
mod insinuate;
mod live;
pub mod model;
mod name;
mod reference;
mod registry;
pub mod transfer;

pub use accessor::CatReg;
pub use cache::RegistryCache;
pub use collection::{CollectionWrapper, DocMeta, LibraryIndex, RegEntry};
pub use ctx::OpCtx;
pub use drop::{DocumentKind, DropPayload, DropResolver, DropSummary, HostDocument};
pub use env::RegistryEnv;
pub use error::{RegistryError, RegistryResult};
pub use fetch_cache::{FetchCache, FetchFuture, Fetched};
pub use insinuate::{insinuate, insinuate_one, DefaultHooks, InsinuationHooks, Insinuated};
pub use live::{Link, LiveEntity};
pub use model::{Category, RawData, RefSlot, TagInstance};
pub use name::{ActorSource, ItemSource, RegConfig};
pub use reference::RegRef;
pub use registry::{Registry, Resolved};
pub use transfer::take_ownership;
