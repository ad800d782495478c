//! Cogs compiled into the binary

pub mod general;
pub mod owner;

use crate::application::errors::CogError;
use crate::domain::entities::ModuleId;
use crate::infrastructure::cogs::StaticResolver;

/// Resolver over every built-in cog
pub fn builtin_resolver() -> Result<StaticResolver, CogError> {
    Ok(StaticResolver::new()
        .with_module(ModuleId::parse(owner::MODULE)?, owner::OwnerSetup)
        .with_module(ModuleId::parse(general::MODULE)?, general::GeneralSetup))
}
