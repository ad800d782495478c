use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::CogError;
use crate::domain::entities::{Command, ModuleId};
use crate::infrastructure::config::Config;

/// A loaded cog: a bundle of commands plus the resources behind them
#[async_trait]
pub trait Cog: Send + Sync {
    /// Human-readable name, e.g. `Owner`
    fn name(&self) -> &str;

    /// Commands this cog contributes to the registry
    fn commands(&self) -> Vec<Command>;

    /// Release held resources. Called once when the cog is unloaded.
    async fn teardown(&self) -> Result<(), String> {
        Ok(())
    }
}

/// What a cog's setup function receives
#[derive(Clone)]
pub struct SetupContext {
    pub id: ModuleId,
    pub config: Arc<Config>,
}

/// Entry point that constructs a cog
#[async_trait]
pub trait CogSetup: Send + Sync {
    async fn setup(&self, ctx: &SetupContext) -> Result<Box<dyn Cog>, String>;
}

/// Turns module identifiers into setup entry points
pub trait ModuleResolver: Send + Sync {
    /// Every module known under the cog namespace, sorted
    fn discover(&self) -> Vec<ModuleId>;

    /// Fails with `NotFound` or `NoEntryPoint`
    fn resolve(&self, id: &ModuleId) -> Result<Arc<dyn CogSetup>, CogError>;
}

/// Asks the operator whether a newly discovered module should be enabled
pub trait ModulePrompt: Send + Sync {
    fn confirm(&self, id: &ModuleId) -> bool;
}
