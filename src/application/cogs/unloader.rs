//! Cog unloader - deregisters a cog and releases its resources

use tokio::sync::RwLock;

use super::loader::LoadedCogs;
use crate::application::errors::CogError;
use crate::domain::entities::{CommandRegistry, ModuleId};

pub struct CogUnloader {
    core: ModuleId,
}

impl CogUnloader {
    pub fn new(core: ModuleId) -> Self {
        Self { core }
    }

    pub fn core(&self) -> &ModuleId {
        &self.core
    }

    /// Unload `id`.
    ///
    /// The core module is refused unless `reloading` is set. Commands are
    /// removed before teardown runs, so a failing teardown still leaves no
    /// handler pointing at the discarded instance.
    pub async fn unload(
        &self,
        id: &ModuleId,
        reloading: bool,
        loaded: &LoadedCogs,
        registry: &RwLock<CommandRegistry>,
    ) -> Result<(), CogError> {
        if *id == self.core && !reloading {
            return Err(CogError::Protected(id.clone()));
        }

        let cog = loaded
            .lock()
            .await
            .remove(id)
            .ok_or_else(|| CogError::NotLoaded(id.clone()))?;

        let removed = registry.write().await.deregister_all_for(id);
        tracing::debug!("Deregistered {} commands of {}", removed, id);

        match cog.instance.teardown().await {
            Ok(()) => {
                tracing::info!("Unloaded cog {}", id);
                Ok(())
            }
            Err(cause) => {
                tracing::error!("Teardown of {} failed: {}", id, cause);
                Err(CogError::Unload {
                    id: id.clone(),
                    cause,
                })
            }
        }
    }
}
