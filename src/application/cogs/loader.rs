//! Cog loader - resolves, constructs and registers a cog

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::application::errors::CogError;
use crate::domain::entities::{CommandRegistry, ModuleId};
use crate::domain::traits::{Cog, ModuleResolver, SetupContext};
use crate::infrastructure::config::Config;

/// A live cog instance together with what it registered
pub struct LoadedCog {
    pub id: ModuleId,
    pub instance: Box<dyn Cog>,
    pub commands: Vec<String>,
}

/// Currently loaded cogs, at most one per identifier
pub type LoadedCogs = Mutex<HashMap<ModuleId, LoadedCog>>;

pub struct CogLoader {
    resolver: Arc<dyn ModuleResolver>,
    config: Arc<Config>,
}

impl CogLoader {
    pub fn new(resolver: Arc<dyn ModuleResolver>, config: Arc<Config>) -> Self {
        Self { resolver, config }
    }

    pub fn resolver(&self) -> &Arc<dyn ModuleResolver> {
        &self.resolver
    }

    /// Load `id` into `loaded` and register its commands.
    ///
    /// Either the cog ends up in `loaded` with every command registered, or
    /// neither `loaded` nor `registry` changes.
    pub async fn load(
        &self,
        id: &ModuleId,
        loaded: &LoadedCogs,
        registry: &RwLock<CommandRegistry>,
    ) -> Result<(), CogError> {
        if loaded.lock().await.contains_key(id) {
            return Err(CogError::AlreadyLoaded(id.clone()));
        }

        let setup = self.resolver.resolve(id)?;
        let ctx = SetupContext {
            id: id.clone(),
            config: self.config.clone(),
        };

        let instance = setup.setup(&ctx).await.map_err(|cause| CogError::Load {
            id: id.clone(),
            cause,
        })?;

        let commands = instance.commands();
        let names: Vec<String> = commands.iter().map(|c| c.name.clone()).collect();

        let registered = registry.write().await.register_all(id, commands);
        if let Err(e) = registered {
            tracing::warn!("Discarding {} after failed registration: {}", id, e);
            if let Err(cause) = instance.teardown().await {
                tracing::warn!("Teardown of rejected cog {} failed: {}", id, cause);
            }
            return Err(e);
        }

        tracing::info!("Loaded cog {} ({}) with {} commands", id, instance.name(), names.len());
        loaded.lock().await.insert(
            id.clone(),
            LoadedCog {
                id: id.clone(),
                instance,
                commands: names,
            },
        );
        Ok(())
    }
}
