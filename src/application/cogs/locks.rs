//! Per-module serialization of lifecycle operations

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::entities::ModuleId;

/// One async mutex per module identifier, alive while someone holds or waits on it
#[derive(Default)]
pub struct ModuleLocks {
    locks: StdMutex<HashMap<ModuleId, Arc<Mutex<()>>>>,
}

/// Held for the duration of one lifecycle operation
pub struct ModuleGuard<'a> {
    locks: &'a ModuleLocks,
    id: ModuleId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ModuleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other lifecycle operation holds `id`.
    pub async fn acquire(&self, id: &ModuleId) -> ModuleGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(id.clone()).or_default().clone()
        };
        ModuleGuard {
            locks: self,
            id: id.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn release(&self, id: &ModuleId) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map itself still points at the mutex: nobody is waiting.
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }
}

impl Drop for ModuleGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.id);
    }
}
