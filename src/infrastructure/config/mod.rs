//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;
use crate::domain::entities::ModuleId;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub cogs: CogsConfig,
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub prefixes: Vec<String>,
    /// Platform user id allowed to run owner commands
    pub owner: Option<String>,
    pub data_dir: PathBuf,
    pub debug: bool,
}

/// What to do with a discovered cog that has no registry entry yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultPolicy {
    Enable,
    Disable,
    Ask,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CogsConfig {
    /// Module that is always loaded first and can only be reloaded
    pub core: String,
    /// Modules enabled on first run, when no registry exists yet
    pub defaults: Vec<String>,
    pub default_policy: DefaultPolicy,
    pub registry_file: String,
    pub disabled_commands_file: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdaptersConfig {
    pub telegram: Option<TelegramConfig>,
    pub console: Option<ConsoleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TelegramConfig {
    pub enabled: bool,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConsoleConfig {
    pub enabled: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "chronoxia".to_string(),
            prefixes: vec!["!".to_string()],
            owner: None,
            data_dir: PathBuf::from("data/chronoxia"),
            debug: false,
        }
    }
}

impl Default for CogsConfig {
    fn default() -> Self {
        Self {
            core: "cogs.owner".to_string(),
            defaults: vec!["cogs.general".to_string()],
            default_policy: DefaultPolicy::Disable,
            registry_file: "cogs.json".to_string(),
            disabled_commands_file: "disabled_commands.json".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(token) = std::env::var("BOT_TOKEN") {
            config.adapters.telegram = Some(TelegramConfig {
                enabled: true,
                token: Some(token),
            });
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            config.bot.prefixes = vec![prefix];
        }

        if let Ok(owner) = std::env::var("BOT_OWNER") {
            config.bot.owner = Some(owner);
        }

        config
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue("bot.prefixes must not contain empty prefixes".to_string()));
        }
        self.core_module()?;
        self.default_modules()?;
        Ok(())
    }

    pub fn core_module(&self) -> Result<ModuleId, ConfigError> {
        ModuleId::parse(&self.cogs.core)
            .map_err(|e| ConfigError::InvalidValue(format!("cogs.core: {}", e)))
    }

    pub fn default_modules(&self) -> Result<Vec<ModuleId>, ConfigError> {
        self.cogs
            .defaults
            .iter()
            .map(|raw| {
                ModuleId::normalize(raw)
                    .map_err(|e| ConfigError::InvalidValue(format!("cogs.defaults: {}", e)))
            })
            .collect()
    }

    /// Telegram token, if the adapter is enabled
    pub fn telegram_token(&self) -> Option<String> {
        self.adapters
            .telegram
            .as_ref()
            .filter(|t| t.enabled)
            .and_then(|t| t.token.clone())
    }
}
