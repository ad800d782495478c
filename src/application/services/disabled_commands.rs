//! Persisted set of administratively disabled commands and modules

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::warn;

use crate::application::errors::StorageError;
use crate::domain::entities::ModuleId;
use crate::domain::traits::DocumentStore;

/// Command names and module identifiers the owner switched off.
///
/// Stored as `{"<name>": true}`; a plain array of names is accepted on load.
pub struct DisabledCommands {
    store: Arc<dyn DocumentStore>,
    path: String,
    names: Mutex<BTreeSet<String>>,
}

impl DisabledCommands {
    pub async fn load(store: Arc<dyn DocumentStore>, path: impl Into<String>) -> Self {
        let path = path.into();
        let names = parse(&path, store.load(&path).await);
        Self {
            store,
            path,
            names: Mutex::new(names),
        }
    }

    /// Returns false when `name` was already disabled
    pub async fn disable(&self, name: &str) -> Result<bool, StorageError> {
        let mut names = self.names.lock().await;
        if !names.insert(name.to_lowercase()) {
            return Ok(false);
        }
        self.save(&names).await?;
        Ok(true)
    }

    /// Returns false when `name` was not disabled
    pub async fn enable(&self, name: &str) -> Result<bool, StorageError> {
        let mut names = self.names.lock().await;
        if !names.remove(&name.to_lowercase()) {
            return Ok(false);
        }
        self.save(&names).await?;
        Ok(true)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.names.lock().await.contains(&name.to_lowercase())
    }

    /// A command is off when its own name or its owning module is listed
    pub async fn is_disabled(&self, command: &str, owner: Option<&ModuleId>) -> bool {
        let names = self.names.lock().await;
        names.contains(&command.to_lowercase()) || owner.is_some_and(|id| names.contains(id.as_str()))
    }

    async fn save(&self, names: &BTreeSet<String>) -> Result<(), StorageError> {
        let doc: Map<String, Value> = names.iter().map(|n| (n.clone(), Value::Bool(true))).collect();
        self.store.save(&self.path, &Value::Object(doc)).await
    }
}

fn parse(path: &str, doc: Value) -> BTreeSet<String> {
    match doc {
        Value::Object(map) => map
            .into_iter()
            .filter(|(_, v)| v.as_bool().unwrap_or(false))
            .map(|(k, _)| k.to_lowercase())
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_lowercase))
            .collect(),
        other => {
            warn!("Ignoring {}: expected an object, found {}", path, other);
            BTreeSet::new()
        }
    }
}
