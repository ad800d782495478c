//! Persisted registry entries: module id -> load at startup

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::errors::StorageError;
use crate::domain::entities::ModuleId;
use crate::domain::traits::DocumentStore;

pub type RegistryEntries = BTreeMap<ModuleId, bool>;

/// Reads and writes the registry entry document
#[derive(Clone)]
pub struct CogRegistryStore {
    store: Arc<dyn DocumentStore>,
    path: String,
}

impl CogRegistryStore {
    pub fn new(store: Arc<dyn DocumentStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    /// Load the entries. Anything unreadable is skipped rather than failing.
    pub async fn load(&self) -> RegistryEntries {
        let document = self.store.load(&self.path).await;
        let Some(object) = document.as_object() else {
            tracing::warn!("Registry {} is not an object, starting empty", self.path);
            return RegistryEntries::new();
        };

        let mut entries = RegistryEntries::new();
        for (key, value) in object {
            match (ModuleId::parse(key), value.as_bool()) {
                (Ok(id), Some(enabled)) => {
                    entries.insert(id, enabled);
                }
                _ => tracing::warn!("Skipping malformed registry entry {}: {}", key, value),
            }
        }
        entries
    }

    pub async fn save(&self, entries: &RegistryEntries) -> Result<(), StorageError> {
        let object: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(id, enabled)| (id.to_string(), serde_json::Value::Bool(*enabled)))
            .collect();
        self.store.save(&self.path, &serde_json::Value::Object(object)).await
    }

    pub async fn exists(&self) -> bool {
        self.store.exists(&self.path).await
    }
}
