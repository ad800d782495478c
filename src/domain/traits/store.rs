use async_trait::async_trait;
use crate::application::errors::StorageError;

/// Whole-document persistence keyed by a relative path
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document. Missing or unreadable documents come back as an empty object.
    async fn load(&self, path: &str) -> serde_json::Value;

    /// Overwrite a document.
    async fn save(&self, path: &str, document: &serde_json::Value) -> Result<(), StorageError>;

    /// Whether a document exists at all
    async fn exists(&self, path: &str) -> bool;
}
