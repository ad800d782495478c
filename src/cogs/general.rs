//! General cog - everyday commands available to everyone

use async_trait::async_trait;

use crate::application::errors::CommandError;
use crate::application::session::format_duration;
use crate::domain::entities::{Command, CommandContext};
use crate::domain::traits::{Cog, CogSetup, SetupContext};

pub const MODULE: &str = "cogs.general";

pub struct GeneralSetup;

#[async_trait]
impl CogSetup for GeneralSetup {
    async fn setup(&self, _ctx: &SetupContext) -> Result<Box<dyn Cog>, String> {
        Ok(Box::new(General))
    }
}

pub struct General;

#[async_trait]
impl Cog for General {
    fn name(&self) -> &str {
        "General"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("ping")
                .with_description("Check the bot is alive")
                .with_handler(|_ctx: CommandContext| async move { Ok::<_, CommandError>("Pong.".to_string()) }),
            Command::new("say")
                .with_description("Repeat a message")
                .with_usage("say <text>")
                .with_aliases(vec!["echo".to_string()])
                .with_handler(say),
            Command::new("uptime")
                .with_description("Show how long the bot has been running")
                .with_handler(uptime),
            Command::new("stats")
                .with_description("Show session statistics")
                .with_handler(stats),
        ]
    }
}

async fn say(ctx: CommandContext) -> Result<String, CommandError> {
    let text = ctx.rest();
    if text.is_empty() {
        return Err(CommandError::InvalidArgs("nothing to say".to_string()));
    }
    Ok(text)
}

async fn uptime(ctx: CommandContext) -> Result<String, CommandError> {
    let status = ctx.session.status().await;
    Ok(format!("Been up for: {}", format_duration(status.uptime)))
}

async fn stats(ctx: CommandContext) -> Result<String, CommandError> {
    let status = ctx.session.status().await;
    Ok(format!(
        "{}\nMessages read: {}\nCommands run: {}\nResumed sessions: {}\nUptime: {}",
        status.summary(),
        status.counters.messages_read,
        status.counters.processed_commands,
        status.counters.session_resumed,
        format_duration(status.uptime),
    ))
}
