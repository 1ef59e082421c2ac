//! Operation contexts
//!
//! TigerStyle: One context per logical operation, never reused.
//!
//! An `OpCtx` maps document id to the live entity revived for it during one
//! call tree (rendering a sheet, resolving a drop, an insinuation). It is what
//! makes repeated references hydrate once and cyclic references terminate.
//!
//! The context owns the entities; links between entities are weak, so dropping
//! the context releases the whole revived graph.
//!
//! Hydration through one context is sequential. Sharing a context between
//! concurrently running call trees is not supported.

use crate::live::LiveEntity;
use machina_core::OP_CTX_ENTRIES_COUNT_WARN;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Per-operation id → live entity map
#[derive(Debug)]
pub struct OpCtx {
    entries: Mutex<HashMap<String, Arc<LiveEntity>>>,
    warn_threshold: usize,
    warned: AtomicBool,
}

impl Default for OpCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl OpCtx {
    pub fn new() -> Self {
        Self::with_warn_threshold(OP_CTX_ENTRIES_COUNT_WARN)
    }

    /// Context that logs once when it grows past `threshold` entries
    pub fn with_warn_threshold(threshold: usize) -> Self {
        assert!(threshold > 0, "warn threshold must be positive");
        Self {
            entries: Mutex::new(HashMap::new()),
            warn_threshold: threshold,
            warned: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<LiveEntity>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Entity revived for `id`, ready or not
    pub fn get(&self, id: &str) -> Option<Arc<LiveEntity>> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Register an entity before its references are hydrated
    pub(crate) fn insert(&self, entity: Arc<LiveEntity>) {
        let len = {
            let mut entries = self.lock();
            entries.insert(entity.id().to_string(), entity);
            entries.len()
        };
        if len > self.warn_threshold && !self.warned.swap(true, Ordering::Relaxed) {
            warn!(
                entries = len,
                threshold = self.warn_threshold,
                "operation context unusually large; contexts should not outlive one operation"
            );
        }
    }
}
