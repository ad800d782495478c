use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::{Message, ModuleId};
use crate::application::errors::{BotError, CogError, CommandError};
use crate::application::session::Session;

/// Permission required by administrative commands
pub const OWNER_PERMISSION: &str = "owner";

/// Everything a command handler gets to work with
#[derive(Clone)]
pub struct CommandContext {
    pub session: Arc<Session>,
    pub message: Message,
    pub command: String,
    pub args: Vec<String>,
}

impl CommandContext {
    /// Arguments joined back into a single string
    pub fn rest(&self) -> String {
        self.args.join(" ")
    }

    /// Send an extra message to the invoking chat, besides the handler's reply
    pub async fn say(&self, text: &str) -> Result<String, BotError> {
        self.session.transport().send_message(&self.message.chat_id, text).await
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<String, CommandError>> + Send>>;

/// Command handler function type
pub type CommandHandler = Arc<dyn Fn(CommandContext) -> HandlerFuture + Send + Sync>;

/// Represents a bot command
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub usage: Option<String>,
    pub handler: Option<CommandHandler>,
    pub permissions: Vec<String>,
    pub enabled: bool,
    /// Module that registered this command, set by the registry
    pub owner: Option<ModuleId>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            description: None,
            aliases: Vec::new(),
            usage: None,
            handler: None,
            permissions: Vec::new(),
            enabled: true,
            owner: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases.into_iter().map(|a| a.to_lowercase()).collect();
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Shorthand for `with_permission(OWNER_PERMISSION)`
    pub fn owner_only(self) -> Self {
        self.with_permission(OWNER_PERMISSION)
    }

    /// Register the command but refuse it at dispatch time
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, CommandError>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx| Box::pin(handler(ctx))));
        self
    }

    pub fn requires_owner(&self) -> bool {
        self.permissions.iter().any(|p| p == OWNER_PERMISSION)
    }

    /// Name followed by every alias
    fn keys(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.name).chain(self.aliases.iter())
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("enabled", &self.enabled)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Command registry for managing available commands.
///
/// Names and aliases share one namespace; a key can point at only one command.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
    /// alias -> command name
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_taken(&self, key: &str) -> bool {
        self.commands.contains_key(key) || self.aliases.contains_key(key)
    }

    /// Register a single command.
    pub fn register(&mut self, command: Command) -> Result<(), CommandError> {
        if let Some(key) = command.keys().find(|k| self.is_taken(k)) {
            return Err(CommandError::Duplicate(key.clone()));
        }
        self.insert(command);
        Ok(())
    }

    /// Register every command of a module, or none of them.
    pub fn register_all(&mut self, owner: &ModuleId, commands: Vec<Command>) -> Result<(), CogError> {
        let mut batch: Vec<&String> = Vec::new();
        for command in &commands {
            for key in command.keys() {
                if self.is_taken(key) || batch.contains(&key) {
                    return Err(CogError::DuplicateCommand {
                        id: owner.clone(),
                        command: key.clone(),
                    });
                }
                batch.push(key);
            }
        }

        for mut command in commands {
            command.owner = Some(owner.clone());
            self.insert(command);
        }
        Ok(())
    }

    fn insert(&mut self, command: Command) {
        for alias in &command.aliases {
            self.aliases.insert(alias.clone(), command.name.clone());
        }
        self.commands.insert(command.name.clone(), command);
    }

    /// Remove every command owned by `owner`; returns how many were removed.
    pub fn deregister_all_for(&mut self, owner: &ModuleId) -> usize {
        let names: Vec<String> = self
            .commands
            .values()
            .filter(|c| c.owner.as_ref() == Some(owner))
            .map(|c| c.name.clone())
            .collect();

        for name in &names {
            if let Some(command) = self.commands.remove(name) {
                for alias in &command.aliases {
                    self.aliases.remove(alias);
                }
            }
        }
        names.len()
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(&name.to_lowercase())
    }

    /// Look a command up by name or alias. Disabled commands are returned too.
    pub fn dispatch(&self, input: &str) -> Option<&Command> {
        let key = input.to_lowercase();
        match self.aliases.get(&key) {
            Some(name) => self.commands.get(name),
            None => self.commands.get(&key),
        }
    }

    /// Commands owned by a module, sorted by name
    pub fn owned_by(&self, owner: &ModuleId) -> Vec<&Command> {
        let mut commands: Vec<&Command> = self
            .commands
            .values()
            .filter(|c| c.owner.as_ref() == Some(owner))
            .collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }

    /// Sorted (key, command name, owner) triples, aliases included
    pub fn snapshot(&self) -> Vec<(String, String, Option<ModuleId>)> {
        let mut entries: Vec<_> = self
            .commands
            .values()
            .flat_map(|c| c.keys().map(move |k| (k.clone(), c.name.clone(), c.owner.clone())))
            .collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
