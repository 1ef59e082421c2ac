//! Machina Core
//!
//! Core types, errors, and constants for the machina entity registry.
//!
//! # Overview
//!
//! Machina stores the rules-engine object model of a tabletop RPG (pilots, mechs,
//! weapons, systems, tags, ...) across several physical locations of a host
//! virtual-tabletop document store, and presents one uniform CRUD and
//! reference-resolution interface over all of them.
//!
//! # TigerStyle
//!
//! - Explicit limits with big-endian naming (e.g., `DOC_ID_LENGTH_BYTES_MAX`)
//! - Misses are values (`Option`), failures are `Result`
//! - All time and randomness flows through injectable providers

pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod telemetry;

pub use config::{CacheConfig, HydrationConfig, MachinaConfig, StoreBackend, StoreConfig};
pub use constants::*;
pub use error::{Error, Result};
pub use io::{IoContext, ManualClock, RngProvider, StdRngProvider, TimeProvider, WallClockTime};
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
