//! File-based storage implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::domain::traits::DocumentStore;
use crate::application::errors::StorageError;

fn empty_document() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// JSON documents on disk, one file per path under `base_path`.
///
/// Writes go to a temp file that is renamed over the target, and writes to the
/// same path are serialized.
pub struct JsonFileStore {
    base_path: PathBuf,
    write_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl JsonFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    async fn lock_for(&self, path: &PathBuf) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().await;
        locks.entry(path.clone()).or_default().clone()
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load(&self, path: &str) -> serde_json::Value {
        let full = self.resolve(path);
        let content = match tokio::fs::read_to_string(&full).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return empty_document(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", full.display(), e);
                return empty_document();
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Ignoring corrupt document {}: {}", full.display(), e);
                empty_document()
            }
        }
    }

    async fn save(&self, path: &str, document: &serde_json::Value) -> Result<(), StorageError> {
        let full = self.resolve(path);
        let lock = self.lock_for(&full).await;
        let _guard = lock.lock().await;

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(document)?;
        let tmp = full.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, content).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &full).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::metadata(self.resolve(path)).await.is_ok()
    }
}

/// In-memory store for tests and throwaway sessions
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document before the store is handed out
    pub async fn insert(&self, path: &str, document: serde_json::Value) {
        self.documents.write().await.insert(path.to_string(), document);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, path: &str) -> serde_json::Value {
        self.documents
            .read()
            .await
            .get(path)
            .cloned()
            .unwrap_or_else(empty_document)
    }

    async fn save(&self, path: &str, document: &serde_json::Value) -> Result<(), StorageError> {
        self.documents.write().await.insert(path.to_string(), document.clone());
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.documents.read().await.contains_key(path)
    }
}
