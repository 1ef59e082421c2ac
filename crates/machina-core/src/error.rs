//! Error types for machina
//!
//! TigerStyle: Explicit error types with context, using thiserror.

use thiserror::Error;

/// Result type alias for machina operations
pub type Result<T> = std::result::Result<T, Error>;

/// Machina error types
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Document Errors
    // =========================================================================
    #[error("Document not found: {id} in {scope}")]
    DocumentNotFound { id: String, scope: String },

    #[error("Document already exists: {id} in {scope}")]
    DocumentAlreadyExists { id: String, scope: String },

    #[error("Document type mismatch: {id} is {found}, expected {expected}")]
    DocumentTypeMismatch {
        id: String,
        expected: String,
        found: String,
    },

    // =========================================================================
    // Owner Errors
    // =========================================================================
    #[error("Owner not found: {kind} {id}")]
    OwnerNotFound { kind: String, id: String },

    // =========================================================================
    // Naming / Category Errors
    // =========================================================================
    #[error("Invalid registry name: {name}, reason: {reason}")]
    InvalidRegistryName { name: String, reason: String },

    #[error("Unknown category: {category}")]
    UnknownCategory { category: String },

    #[error("Invalid document id: {id}, reason: {reason}")]
    InvalidDocumentId { id: String, reason: String },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    #[error("Storage read failed: {scope}, reason: {reason}")]
    StorageReadFailed { scope: String, reason: String },

    #[error("Storage write failed: {scope}, reason: {reason}")]
    StorageWriteFailed { scope: String, reason: String },

    #[error("Permission denied: {scope}, reason: {reason}")]
    PermissionDenied { scope: String, reason: String },

    #[error("Batch too large: {count} documents exceeds limit of {limit}")]
    BatchTooLarge { count: usize, limit: usize },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Serialization failed: {reason}")]
    SerializationFailed { reason: String },

    #[error("Deserialization failed: {reason}")]
    DeserializationFailed { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a document not found error
    pub fn document_not_found(id: impl Into<String>, scope: impl ToString) -> Self {
        Self::DocumentNotFound {
            id: id.into(),
            scope: scope.to_string(),
        }
    }

    /// Create an owner not found error
    pub fn owner_not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::OwnerNotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create an invalid registry name error
    pub fn invalid_registry_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRegistryName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(scope: impl ToString, reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            scope: scope.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is a miss rather than a failure
    ///
    /// Misses are routinely degraded to absence by the registry layer.
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            Self::DocumentNotFound { .. } | Self::OwnerNotFound { .. }
        )
    }

    /// Check if this error is retriable
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::StorageReadFailed { .. } | Self::StorageWriteFailed { .. } | Self::Io(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Self::DeserializationFailed {
                reason: err.to_string(),
            }
        } else {
            Self::SerializationFailed {
                reason: err.to_string(),
            }
        }
    }
}
