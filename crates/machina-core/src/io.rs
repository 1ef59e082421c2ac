//! I/O abstraction layer
//!
//! TigerStyle: All non-deterministic operations go through abstraction traits.
//!
//! - **Time**: wall clock vs manually advanced clock (TTL expiry tests)
//! - **Random**: seeded generator for document ids
//!
//! The same registry code runs against both; only the providers differ.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::DOC_ID_LENGTH_CHARS;

// ============================================================================
// Time Provider
// ============================================================================

/// Time provider abstraction
///
/// All code that needs current time MUST use this trait.
#[async_trait]
pub trait TimeProvider: Send + Sync + std::fmt::Debug {
    /// Get current time in milliseconds since epoch
    fn now_ms(&self) -> u64;

    /// Sleep for the specified duration
    async fn sleep_ms(&self, ms: u64);
}

/// Production time provider using wall clock
#[derive(Debug, Clone, Default)]
pub struct WallClockTime;

impl WallClockTime {
    /// Create a new wall clock time provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TimeProvider for WallClockTime {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
    }
}

/// Manually advanced clock
///
/// Time only moves when told to. Sleeping advances the clock instantly.
#[derive(Debug, Default)]
pub struct ManualClock {
    time_ms: AtomicU64,
}

impl ManualClock {
    /// Create a new clock at the given time
    pub fn new(initial_ms: u64) -> Self {
        Self {
            time_ms: AtomicU64::new(initial_ms),
        }
    }

    /// Advance time by the given milliseconds
    pub fn advance(&self, ms: u64) {
        self.time_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set time to a specific value
    pub fn set(&self, ms: u64) {
        self.time_ms.store(ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl TimeProvider for ManualClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }

    async fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// RNG Provider
// ============================================================================

const DOC_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random number generator abstraction
///
/// All code that needs randomness (document ids) MUST use this trait.
pub trait RngProvider: Send + Sync + std::fmt::Debug {
    /// Generate a random u64
    fn next_u64(&self) -> u64;

    /// Generate a host-style document id: 16 alphanumeric characters
    fn gen_doc_id(&self) -> String {
        let mut id = String::with_capacity(DOC_ID_LENGTH_CHARS);
        let mut bits = self.next_u64();
        for i in 0..DOC_ID_LENGTH_CHARS {
            // 10 chars per u64 at 6 bits each
            if i > 0 && i % 10 == 0 {
                bits = self.next_u64();
            }
            let idx = (bits & 0x3f) as usize % DOC_ID_ALPHABET.len();
            id.push(DOC_ID_ALPHABET[idx] as char);
            bits >>= 6;
        }
        debug_assert_eq!(id.len(), DOC_ID_LENGTH_CHARS);
        id
    }
}

/// Production RNG provider
///
/// xorshift64* over an atomic state. Not cryptographically secure.
#[derive(Debug)]
pub struct StdRngProvider {
    state: AtomicU64,
}

impl Default for StdRngProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StdRngProvider {
    /// Create a new RNG provider seeded from system time
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::with_seed(seed)
    }

    /// Create with specific seed (for testing)
    pub fn with_seed(seed: u64) -> Self {
        // xorshift has a fixed point at zero
        let seed = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self {
            state: AtomicU64::new(seed),
        }
    }
}

impl RngProvider for StdRngProvider {
    fn next_u64(&self) -> u64 {
        let mut state = self.state.load(Ordering::Relaxed);
        loop {
            let mut x = state;
            x ^= x >> 12;
            x ^= x << 25;
            x ^= x >> 27;

            match self
                .state
                .compare_exchange_weak(state, x, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return x.wrapping_mul(0x2545_F491_4F6C_DD1D),
                Err(s) => state = s,
            }
        }
    }
}

// ============================================================================
// I/O Context
// ============================================================================

/// Bundle of all I/O providers
#[derive(Clone)]
pub struct IoContext {
    /// Time provider
    pub time: Arc<dyn TimeProvider>,
    /// RNG provider
    pub rng: Arc<dyn RngProvider>,
}

impl std::fmt::Debug for IoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoContext")
            .field("time", &self.time)
            .field("rng", &self.rng)
            .finish()
    }
}

impl Default for IoContext {
    fn default() -> Self {
        Self::production()
    }
}

impl IoContext {
    /// Create production I/O context with real wall clock and RNG
    pub fn production() -> Self {
        Self {
            time: Arc::new(WallClockTime::new()),
            rng: Arc::new(StdRngProvider::new()),
        }
    }

    /// Create I/O context with custom providers
    pub fn new(time: Arc<dyn TimeProvider>, rng: Arc<dyn RngProvider>) -> Self {
        Self { time, rng }
    }

    /// Deterministic context: seeded ids and a manual clock
    pub fn deterministic(seed: u64, clock: Arc<ManualClock>) -> Self {
        Self {
            time: clock,
            rng: Arc::new(StdRngProvider::with_seed(seed)),
        }
    }

    /// Get current time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.time.now_ms()
    }

    /// Generate a document id
    pub fn gen_doc_id(&self) -> String {
        self.rng.gen_doc_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_time_now_ms() {
        let clock = WallClockTime::new();
        let now = clock.now_ms();
        assert!(now > 1577836800000); // Jan 1, 2020
        assert!(clock.now_ms() >= now);
    }

    #[tokio::test]
    async fn test_manual_clock_advances_only_when_told() {
        let clock = ManualClock::new(1000);
        assert_eq!(clock.now_ms(), 1000);

        clock.advance(250);
        assert_eq!(clock.now_ms(), 1250);

        clock.sleep_ms(50).await;
        assert_eq!(clock.now_ms(), 1300);

        clock.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_doc_id_shape() {
        let rng = StdRngProvider::with_seed(42);
        let id = rng.gen_doc_id();
        assert_eq!(id.len(), DOC_ID_LENGTH_CHARS);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_doc_ids_deterministic_with_seed() {
        let a = StdRngProvider::with_seed(7);
        let b = StdRngProvider::with_seed(7);
        assert_eq!(a.gen_doc_id(), b.gen_doc_id());
        assert_ne!(a.gen_doc_id(), StdRngProvider::with_seed(8).gen_doc_id());
    }

    #[test]
    fn test_zero_seed_is_not_stuck() {
        let rng = StdRngProvider::with_seed(0);
        assert_ne!(rng.next_u64(), rng.next_u64());
    }
}
