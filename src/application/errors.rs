//! Application layer errors

use thiserror::Error;

use crate::domain::entities::ModuleId;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Transport disconnected")]
    Disconnected,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Cog error: {0}")]
    Cog(#[from] CogError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Duplicate command: {0}")]
    Duplicate(String),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Cog lifecycle errors.
///
/// Every variant is recoverable at the cog manager boundary. The only fatal
/// case, a core module that fails to load at startup, is decided by the caller.
#[derive(Error, Debug)]
pub enum CogError {
    #[error("Invalid module identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Module not found: {0}")]
    NotFound(ModuleId),

    #[error("Module {0} has no setup entry point")]
    NoEntryPoint(ModuleId),

    #[error("Failed to load {id}: {cause}")]
    Load { id: ModuleId, cause: String },

    #[error("Module {id} defines command '{command}' which is already registered")]
    DuplicateCommand { id: ModuleId, command: String },

    #[error("Module already loaded: {0}")]
    AlreadyLoaded(ModuleId),

    #[error("Module not loaded: {0}")]
    NotLoaded(ModuleId),

    #[error("Module {0} is protected and can only be unloaded as part of a reload")]
    Protected(ModuleId),

    #[error("Failed to unload {id}: {cause}")]
    Unload { id: ModuleId, cause: String },
}

impl CogError {
    /// Short text shown to the administrator who issued the command.
    pub fn user_message(&self) -> String {
        match self {
            CogError::InvalidIdentifier(raw) => {
                format!("'{}' doesn't look like a module name.", raw)
            }
            CogError::NotFound(_) => "That module could not be found.".to_string(),
            CogError::NoEntryPoint(_) => "That module does not have a setup function.".to_string(),
            CogError::Load { cause, .. } => format!(
                "There was an issue loading this module. Check your console or logs for more information.\n\nError: `{}`",
                cause
            ),
            CogError::DuplicateCommand { command, .. } => format!(
                "That module could not be loaded: the command '{}' is already registered by another module.",
                command
            ),
            CogError::AlreadyLoaded(_) => "That module is already loaded. Use reload instead.".to_string(),
            CogError::NotLoaded(_) => "That module is not loaded.".to_string(),
            CogError::Protected(_) => {
                "The owner module cannot be unloaded. Reload it instead.".to_string()
            }
            CogError::Unload { cause, .. } => format!(
                "The module was unloaded but its cleanup failed. Check your console or logs for more information.\n\nError: `{}`",
                cause
            ),
        }
    }
}

/// Errors that abort startup
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Core module {id} failed to load: {source}")]
    CoreModule {
        id: ModuleId,
        #[source]
        source: CogError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
