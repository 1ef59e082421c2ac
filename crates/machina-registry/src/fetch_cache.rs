//! Async fetch cache
//!
//! TigerStyle: Coalesced fetches, sliding TTL, synchronous peek.
//!
//! `fetch` stores the shared in-flight future before returning, so every
//! caller that arrives before resolution awaits the same underlying fetch.
//! Resolved values are also copied into a shadow map, which is what `peek`
//! and `sync_fetch` read without awaiting. Each key's deadline slides forward
//! on every access; expired keys are swept on `fetch`.

use futures::future::{BoxFuture, FutureExt, Shared};
use machina_core::TimeProvider;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, warn};

/// Shared handle to an in-flight or finished fetch
pub type FetchFuture<V> = Shared<BoxFuture<'static, V>>;

type Fetcher<K, V> = Arc<dyn Fn(K) -> BoxFuture<'static, V> + Send + Sync>;

/// Answer of [`FetchCache::sync_fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<V> {
    /// The value is known
    Ready(V),
    /// A fetch is running in the background
    Pending,
}

impl<V> Fetched<V> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn ready(self) -> Option<V> {
        match self {
            Self::Ready(v) => Some(v),
            Self::Pending => None,
        }
    }
}

struct Pending<V> {
    generation: u64,
    future: FetchFuture<V>,
}

struct CacheState<K, V> {
    pending: HashMap<K, Pending<V>>,
    resolved: HashMap<K, V>,
    deadlines_ms: HashMap<K, u64>,
    next_generation: u64,
}

impl<K: Eq + Hash + Clone, V> CacheState<K, V> {
    fn new() -> Self {
        Self {
            pending: HashMap::new(),
            resolved: HashMap::new(),
            deadlines_ms: HashMap::new(),
            next_generation: 0,
        }
    }

    fn evict(&mut self, key: &K) {
        self.pending.remove(key);
        self.resolved.remove(key);
        self.deadlines_ms.remove(key);
    }

    fn sweep(&mut self, now_ms: u64) -> usize {
        let expired: Vec<K> = self
            .deadlines_ms
            .iter()
            .filter(|(_, deadline)| **deadline < now_ms)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.evict(key);
        }
        expired.len()
    }

    fn is_expired(&self, key: &K, now_ms: u64) -> bool {
        self.deadlines_ms.get(key).is_some_and(|d| *d < now_ms)
    }
}

/// Key → value cache over an async fetcher
pub struct FetchCache<K, V> {
    fetcher: Fetcher<K, V>,
    timeout_ms: u64,
    time: Arc<dyn TimeProvider>,
    state: Arc<Mutex<CacheState<K, V>>>,
}

impl<K, V> Clone for FetchCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            timeout_ms: self.timeout_ms,
            time: self.time.clone(),
            state: self.state.clone(),
        }
    }
}

fn lock<K, V>(state: &Mutex<CacheState<K, V>>) -> MutexGuard<'_, CacheState<K, V>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, V> FetchCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache whose entries live `timeout_ms` past their last access
    pub fn new<F, Fut>(timeout_ms: u64, time: Arc<dyn TimeProvider>, fetcher: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        assert!(timeout_ms > 0, "timeout must be positive");
        Self {
            fetcher: Arc::new(move |key: K| -> BoxFuture<'static, V> { fetcher(key).boxed() }),
            timeout_ms,
            time,
            state: Arc::new(Mutex::new(CacheState::new())),
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Shared future for `key`, starting a fetch if none is cached
    pub fn fetch(&self, key: K) -> FetchFuture<V> {
        let now_ms = self.time.now_ms();
        let mut state = lock(&self.state);
        let swept = state.sweep(now_ms);
        if swept > 0 {
            debug!(swept, "fetch cache entries expired");
        }
        state.deadlines_ms.insert(key.clone(), now_ms + self.timeout_ms);

        if let Some(pending) = state.pending.get(&key) {
            return pending.future.clone();
        }

        let generation = state.next_generation;
        state.next_generation += 1;

        let inner = (self.fetcher)(key.clone());
        let shared_state: Weak<Mutex<CacheState<K, V>>> = Arc::downgrade(&self.state);
        let resolved_key = key.clone();
        let future = async move {
            let value = inner.await;
            if let Some(state) = shared_state.upgrade() {
                let mut state = lock(&state);
                // Only record values of the generation still cached
                let current = state
                    .pending
                    .get(&resolved_key)
                    .is_some_and(|p| p.generation == generation);
                if current {
                    state.resolved.insert(resolved_key, value.clone());
                }
            }
            value
        }
        .boxed()
        .shared();

        state.pending.insert(
            key,
            Pending {
                generation,
                future: future.clone(),
            },
        );
        future
    }

    /// Resolved value for `key`, if known; extends its lifetime
    pub fn peek(&self, key: &K) -> Option<V> {
        let now_ms = self.time.now_ms();
        let mut state = lock(&self.state);
        if state.is_expired(key, now_ms) {
            state.evict(key);
            return None;
        }
        let value = state.resolved.get(key).cloned();
        if value.is_some() {
            state.deadlines_ms.insert(key.clone(), now_ms + self.timeout_ms);
        }
        value
    }

    /// Known value, or `Pending` after starting a background fetch
    ///
    /// Must be called within a tokio runtime for the background fetch to run;
    /// outside one the fetch is still registered and runs on the next `fetch`.
    pub fn sync_fetch(&self, key: K) -> Fetched<V> {
        if let Some(value) = self.peek(&key) {
            return Fetched::Ready(value);
        }
        let future = self.fetch(key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    future.await;
                });
            }
            Err(_) => warn!("sync_fetch outside a runtime; fetch deferred"),
        }
        Fetched::Pending
    }

    /// Forget `key`
    pub fn flush(&self, key: &K) {
        lock(&self.state).evict(key);
    }

    /// Forget everything
    pub fn flush_all(&self) {
        let mut state = lock(&self.state);
        state.pending.clear();
        state.resolved.clear();
        state.deadlines_ms.clear();
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        lock(&self.state).deadlines_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
