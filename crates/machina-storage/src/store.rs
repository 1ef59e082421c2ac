//! Document store trait
//!
//! TigerStyle: Explicit operations; misses are `None`, failures are errors.

use crate::document::{Document, NewDocument, Scope, TokenInfo};
use async_trait::async_trait;
use machina_core::Result;

/// The host document store
///
/// Implementations own physical persistence. Registries never cache documents
/// beyond one call, except the library index.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create documents in a scope, returning them with assigned ids
    async fn create(&self, scope: &Scope, docs: Vec<NewDocument>) -> Result<Vec<Document>>;

    /// Read a document by id
    async fn get(&self, scope: &Scope, id: &str) -> Result<Option<Document>>;

    /// Replace a document's name, image and payload
    ///
    /// # Errors
    /// `DocumentNotFound` if no document with `doc.id` exists in the scope.
    async fn update(&self, scope: &Scope, doc: Document) -> Result<()>;

    /// Delete a document, returning its last state
    async fn delete(&self, scope: &Scope, id: &str) -> Result<Option<Document>>;

    /// List every document in a scope
    async fn list(&self, scope: &Scope) -> Result<Vec<Document>>;

    /// Find a persistent world actor by id
    async fn find_actor(&self, id: &str) -> Result<Option<Document>>;

    /// Find a token on the active scene by id
    async fn find_token(&self, id: &str) -> Result<Option<TokenInfo>>;

    /// Find an actor stored in any library pack by id
    async fn find_library_actor(&self, id: &str) -> Result<Option<Document>>;

    /// Check whether a document exists
    async fn exists(&self, scope: &Scope, id: &str) -> Result<bool> {
        Ok(self.get(scope, id).await?.is_some())
    }
}
