//! Registry error types
//!
//! TigerStyle: Explicit error variants with context.
//!
//! Resolution misses are not errors; they surface as `None`.

use machina_core::Error as CoreError;
use thiserror::Error;

/// Registry-specific errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Failure in the host store or core layer
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The owner backing an inventory registry is not reachable
    #[error("owner unavailable: {owner}")]
    OwnerUnavailable { owner: String },

    /// The store accepted a create but returned nothing
    #[error("create failed for {category}: {reason}")]
    CreateFailed { category: String, reason: String },

    /// Copying an entity into another registry failed
    #[error("insinuation of {id} into {destination} failed: {reason}")]
    InsinuationFailed {
        id: String,
        destination: String,
        reason: String,
    },

    /// Owned dependents nested deeper than allowed
    #[error("insinuation depth {depth} exceeds limit {max}")]
    InsinuationTooDeep { depth: usize, max: usize },
}

impl RegistryError {
    /// Create an insinuation failed error
    pub fn insinuation_failed(
        id: impl Into<String>,
        destination: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InsinuationFailed {
            id: id.into(),
            destination: destination.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure stems from missing write permission
    ///
    /// Callers at the boundary turn this into a user-visible notification.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Core(CoreError::PermissionDenied { .. }))
    }

    /// Check if this error indicates a retriable condition
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Core(e) => e.is_retriable(),
            _ => false,
        }
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
