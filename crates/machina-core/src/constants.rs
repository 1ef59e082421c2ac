//! TigerStyle constants for machina
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Document Limits
// =============================================================================

/// Length of a generated document id in characters
pub const DOC_ID_LENGTH_CHARS: usize = 16;

/// Maximum length of any document id accepted by the registry in bytes
pub const DOC_ID_LENGTH_BYTES_MAX: usize = 64;

/// Maximum number of documents created in a single batch
pub const DOC_CREATE_BATCH_COUNT_MAX: usize = 1_000;

// =============================================================================
// Registry Naming
// =============================================================================

/// Separates the item-backend segment from the actor-backend segment
pub const REG_NAME_SEGMENT_DELIMITER: char = '|';

/// Introduces the owner id inside an inventory item-backend segment
pub const REG_NAME_OWNER_DELIMITER: char = ':';

/// Maximum length of a registry name in bytes
pub const REG_NAME_LENGTH_BYTES_MAX: usize = 2 * DOC_ID_LENGTH_BYTES_MAX + 32;

// =============================================================================
// Fetch Cache
// =============================================================================

/// Default sliding TTL of a fetch cache entry in milliseconds (1 min)
pub const FETCH_CACHE_TIMEOUT_MS_DEFAULT: u64 = 60 * 1000;

/// Maximum sliding TTL of a fetch cache entry in milliseconds (1 hour)
pub const FETCH_CACHE_TIMEOUT_MS_MAX: u64 = 60 * 60 * 1000;

// =============================================================================
// Hydration
// =============================================================================

/// Soft bound on live entities revived within one operation context.
/// Exceeding it is logged, never enforced.
pub const OP_CTX_ENTRIES_COUNT_WARN: usize = 10_000;

/// Maximum depth of owned dependents carried along by insinuation
pub const INSINUATION_DEPTH_MAX: usize = 4;

// =============================================================================
// Library
// =============================================================================

/// Prefix of library pack names; a pack is named `<prefix>.<category>`
pub const LIBRARY_PACK_PREFIX: &str = "library";

// Compile-time assertions for constant validity
const _: () = {
    assert!(DOC_ID_LENGTH_CHARS <= DOC_ID_LENGTH_BYTES_MAX);
    assert!(FETCH_CACHE_TIMEOUT_MS_DEFAULT <= FETCH_CACHE_TIMEOUT_MS_MAX);
    assert!(REG_NAME_SEGMENT_DELIMITER != REG_NAME_OWNER_DELIMITER);
    assert!(INSINUATION_DEPTH_MAX >= 1);
};
