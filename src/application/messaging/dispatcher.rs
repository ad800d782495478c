//! Message dispatcher - Routes messages to command handlers

use std::sync::Arc;

use tracing::{debug, error};

use super::parser::MessageParser;
use crate::application::errors::{BotError, CommandError};
use crate::application::session::Session;
use crate::domain::entities::{CommandContext, Content, Message};

/// Reply sent when a command, or the module owning it, has been disabled
pub const DISABLED_REPLY: &str = "That command has been disabled by the owner.";

/// Outcome of routing one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Send this text back to the chat
    Reply(String),
    /// Nothing to say: plain text, unknown command, failed check
    Ignored,
}

impl Dispatch {
    pub fn into_reply(self) -> Option<String> {
        match self {
            Dispatch::Reply(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

/// Message dispatcher - resolves commands against the session registry
pub struct MessageDispatcher {
    parser: MessageParser,
}

impl MessageDispatcher {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self {
            parser: MessageParser::new(prefixes),
        }
    }

    /// Process a message and return the reply to send, if any
    pub async fn dispatch(&self, session: &Arc<Session>, message: Message) -> Result<Option<String>, BotError> {
        Ok(self.route(session, message).await.into_reply())
    }

    pub async fn route(&self, session: &Arc<Session>, message: Message) -> Dispatch {
        session.counters().message_read();

        if message.sender.as_ref().is_some_and(|s| s.is_bot) {
            return Dispatch::Ignored;
        }

        let message = self.parser.classify(message);
        let (name, args) = match &message.content {
            Content::Command { name, args } => (name.clone(), args.clone()),
            _ => return Dispatch::Ignored,
        };

        // Copy what we need so the registry lock is not held while the handler runs;
        // owner commands load and unload modules, which write to the registry.
        let (command, handler, owner, usage, requires_owner, enabled) = {
            let registry = session.registry().read().await;
            let Some(cmd) = registry.dispatch(&name) else {
                debug!("Unknown command: {}", name);
                return Dispatch::Ignored;
            };
            (
                cmd.name.clone(),
                cmd.handler.clone(),
                cmd.owner.clone(),
                cmd.usage.clone(),
                cmd.requires_owner(),
                cmd.enabled,
            )
        };

        if requires_owner && !session.is_owner(&message) {
            debug!("{} is not allowed to run '{}'", sender_label(&message), command);
            return Dispatch::Ignored;
        }

        if !enabled || session.disabled().is_disabled(&command, owner.as_ref()).await {
            return Dispatch::Reply(DISABLED_REPLY.to_string());
        }

        let Some(handler) = handler else {
            error!("Command '{}' has no handler", command);
            return Dispatch::Ignored;
        };

        session.counters().command_processed();
        debug!("{} ran '{}' with {:?}", sender_label(&message), command, args);

        let ctx = CommandContext {
            session: session.clone(),
            message,
            command: command.clone(),
            args,
        };

        match handler(ctx).await {
            Ok(reply) => Dispatch::Reply(reply),
            Err(CommandError::InvalidArgs(reason)) => {
                let usage = usage.unwrap_or_else(|| command.clone());
                debug!("Bad arguments for '{}': {}", command, reason);
                Dispatch::Reply(format!("Usage: {}{}", self.display_prefix(), usage))
            }
            Err(e) => {
                error!("Error in command '{}': {}", command, e);
                Dispatch::Reply(format!("Error in command '{}' - {}", command, cause(&e)))
            }
        }
    }

    fn display_prefix(&self) -> &str {
        self.parser.prefixes().last().map(String::as_str).unwrap_or("/")
    }
}

fn sender_label(message: &Message) -> String {
    match &message.sender {
        Some(user) => user.to_string(),
        None => message.platform.clone(),
    }
}

fn cause(e: &CommandError) -> String {
    match e {
        CommandError::ExecutionFailed(cause) => cause.clone(),
        other => other.to_string(),
    }
}
