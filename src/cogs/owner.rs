//! Owner cog - module administration and process control.
//!
//! This is the core module: it is loaded first, cannot be unloaded on its own,
//! and is reloaded in place like any other cog.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::application::cogs::CogStatus;
use crate::application::errors::{CogError, CommandError};
use crate::application::session::ShutdownMode;
use crate::domain::entities::{Command, CommandContext, ModuleId};
use crate::domain::traits::{Cog, CogSetup, SetupContext};

pub const MODULE: &str = "cogs.owner";

pub struct OwnerSetup;

#[async_trait]
impl CogSetup for OwnerSetup {
    async fn setup(&self, _ctx: &SetupContext) -> Result<Box<dyn Cog>, String> {
        Ok(Box::new(Owner))
    }
}

pub struct Owner;

#[async_trait]
impl Cog for Owner {
    fn name(&self) -> &str {
        "Owner"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("load")
                .with_description("Load a module")
                .with_usage("load <module>")
                .owner_only()
                .with_handler(load),
            Command::new("unload")
                .with_description("Unload a module, or every module with `unload all`")
                .with_usage("unload <module|all>")
                .owner_only()
                .with_handler(unload),
            Command::new("unload_all")
                .with_description("Unload every module except this one")
                .owner_only()
                .with_handler(unload_all),
            Command::new("reload")
                .with_description("Reload a module")
                .with_usage("reload <module>")
                .owner_only()
                .with_handler(reload),
            Command::new("cogs")
                .with_description("List loaded and unloaded modules")
                .with_aliases(vec!["modules".to_string()])
                .owner_only()
                .with_handler(cogs),
            Command::new("disable")
                .with_description("Disable a command or a whole module")
                .with_usage("disable <command|module>")
                .owner_only()
                .with_handler(disable),
            Command::new("enable")
                .with_description("Enable a previously disabled command or module")
                .with_usage("enable <command|module>")
                .owner_only()
                .with_handler(enable),
            Command::new("help")
                .with_description("List commands, or show how to use one")
                .with_usage("help [command]")
                .with_handler(help),
            Command::new("shutdown")
                .with_description("Shut the bot down")
                .owner_only()
                .with_handler(shutdown),
            Command::new("restart")
                .with_description("Restart the bot")
                .owner_only()
                .with_handler(restart),
        ]
    }
}

/// The single module argument, with `cogs.` added when missing
fn module_arg(ctx: &CommandContext) -> Result<Result<ModuleId, CogError>, CommandError> {
    let raw = ctx.rest();
    if raw.trim().is_empty() {
        return Err(CommandError::InvalidArgs("missing module name".to_string()));
    }
    Ok(ModuleId::normalize(&raw))
}

async fn load(ctx: CommandContext) -> Result<String, CommandError> {
    let id = match module_arg(&ctx)? {
        Ok(id) => id,
        Err(e) => return Ok(e.user_message()),
    };
    match ctx.session.cogs().load(&id).await {
        Ok(()) => Ok("Module enabled.".to_string()),
        Err(e) => Ok(e.user_message()),
    }
}

async fn unload(ctx: CommandContext) -> Result<String, CommandError> {
    if ctx.rest().trim().eq_ignore_ascii_case("all") {
        return unload_all(ctx).await;
    }
    let id = match module_arg(&ctx)? {
        Ok(id) => id,
        Err(e) => return Ok(e.user_message()),
    };
    match ctx.session.cogs().unload(&id).await {
        Ok(()) => Ok("Module disabled.".to_string()),
        Err(e) => Ok(e.user_message()),
    }
}

async fn unload_all(ctx: CommandContext) -> Result<String, CommandError> {
    let report = ctx.session.cogs().unload_all().await;
    if report.still_loaded.is_empty() {
        return Ok(format!("{} modules unloaded.", report.unloaded.len()));
    }
    let failed: Vec<&str> = report.still_loaded.iter().map(|(id, _)| id.short_name()).collect();
    Ok(format!(
        "These modules were disabled but could not be cleanly unloaded: {}",
        failed.join(", ")
    ))
}

async fn reload(ctx: CommandContext) -> Result<String, CommandError> {
    let id = match module_arg(&ctx)? {
        Ok(id) => id,
        Err(e) => return Ok(e.user_message()),
    };
    match ctx.session.cogs().reload(&id).await {
        Ok(()) => Ok("Module reloaded.".to_string()),
        Err(e) => Ok(e.user_message()),
    }
}

async fn cogs(ctx: CommandContext) -> Result<String, CommandError> {
    let status = ctx.session.cogs().status().await;
    let (loaded, unloaded): (Vec<&CogStatus>, Vec<&CogStatus>) = status.iter().partition(|s| s.loaded);
    Ok(format!("Loaded: {}\nUnloaded: {}", short_names(&loaded), short_names(&unloaded)))
}

fn short_names(rows: &[&CogStatus]) -> String {
    if rows.is_empty() {
        return "None".to_string();
    }
    rows.iter().map(|s| s.id.short_name()).collect::<Vec<_>>().join(", ")
}

/// Resolve a disable/enable target to a command name or a module identifier
async fn toggle_target(ctx: &CommandContext) -> Result<Option<String>, CommandError> {
    let raw = ctx.rest().trim().to_lowercase();
    if raw.is_empty() {
        return Err(CommandError::InvalidArgs("missing command name".to_string()));
    }
    let registry = ctx.session.registry().read().await;
    if let Some(command) = registry.dispatch(&raw) {
        return Ok(Some(command.name.clone()));
    }
    if let Ok(id) = ModuleId::normalize(&raw) {
        if ctx.session.cogs().discover().contains(&id) {
            return Ok(Some(id.to_string()));
        }
    }
    Ok(None)
}

async fn disable(ctx: CommandContext) -> Result<String, CommandError> {
    let Some(target) = toggle_target(&ctx).await? else {
        return Ok("That command doesn't exist.".to_string());
    };

    let core = ctx.session.cogs().core().clone();
    let owned_by_core = {
        let registry = ctx.session.registry().read().await;
        registry.get(&target).is_some_and(|c| c.owner.as_ref() == Some(&core))
    };
    if target == core.as_str() || owned_by_core {
        return Ok("Commands of the owner module can't be disabled.".to_string());
    }

    let changed = ctx
        .session
        .disabled()
        .disable(&target)
        .await
        .map_err(|e| CommandError::ExecutionFailed(e.to_string()))?;
    if changed {
        info!("Disabled {}", target);
        Ok(format!("'{}' has been disabled.", target))
    } else {
        Ok(format!("'{}' is already disabled.", target))
    }
}

async fn enable(ctx: CommandContext) -> Result<String, CommandError> {
    let target = match toggle_target(&ctx).await? {
        Some(target) => target,
        // Allow clearing entries whose command or module no longer exists
        None => stale_target(&ctx).await,
    };

    let changed = ctx
        .session
        .disabled()
        .enable(&target)
        .await
        .map_err(|e| CommandError::ExecutionFailed(e.to_string()))?;
    if changed {
        info!("Enabled {}", target);
        Ok(format!("'{}' has been enabled.", target))
    } else {
        Ok(format!("'{}' is not disabled.", target))
    }
}

/// The disabled-set entry for a target that no longer resolves
async fn stale_target(ctx: &CommandContext) -> String {
    let raw = ctx.rest().trim().to_lowercase();
    if let Ok(id) = ModuleId::normalize(&raw) {
        if ctx.session.disabled().contains(id.as_str()).await {
            return id.to_string();
        }
    }
    raw
}

async fn help(ctx: CommandContext) -> Result<String, CommandError> {
    let is_owner = ctx.session.is_owner(&ctx.message);
    let loaded = ctx.session.cogs().loaded_ids().await;
    let registry = ctx.session.registry().read().await;

    if let Some(name) = ctx.args.first() {
        let Some(command) = registry.dispatch(name).filter(|c| is_owner || !c.requires_owner()) else {
            return Ok(format!("No command called '{}'.", name));
        };
        let mut text = format!("Usage: {}", command.usage.as_deref().unwrap_or(&command.name));
        if let Some(description) = &command.description {
            text.push_str(&format!("\n{}", description));
        }
        if !command.aliases.is_empty() {
            text.push_str(&format!("\nAliases: {}", command.aliases.join(", ")));
        }
        return Ok(text);
    }

    let mut lines = Vec::new();
    for id in loaded {
        let commands: Vec<String> = registry
            .owned_by(&id)
            .into_iter()
            .filter(|c| is_owner || !c.requires_owner())
            .map(|c| match &c.description {
                Some(description) => format!("  {} - {}", c.name, description),
                None => format!("  {}", c.name),
            })
            .collect();
        if commands.is_empty() {
            continue;
        }
        lines.push(format!("{}:", id.short_name()));
        lines.extend(commands);
    }
    Ok(lines.join("\n"))
}

async fn shutdown(ctx: CommandContext) -> Result<String, CommandError> {
    if let Err(e) = ctx.say("Shutting down...").await {
        warn!("Failed to say goodbye: {}", e);
    }
    ctx.session.request_shutdown(ShutdownMode::Shutdown);
    Ok(String::new())
}

async fn restart(ctx: CommandContext) -> Result<String, CommandError> {
    if let Err(e) = ctx.say("Restarting...").await {
        warn!("Failed to say goodbye: {}", e);
    }
    ctx.session.request_shutdown(ShutdownMode::Restart);
    Ok(String::new())
}
