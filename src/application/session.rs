//! Bot session - the process-wide state every lifecycle and dispatch call runs against

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};

use super::cogs::{CogManager, CogRegistryStore, LoadAllOptions, LoadAllReport};
use super::errors::{BotError, ConfigError, StartupError};
use super::messaging::MessageDispatcher;
use super::services::DisabledCommands;
use crate::domain::entities::{CommandRegistry, Message};
use crate::domain::traits::{Bot, DocumentStore, ModulePrompt, ModuleResolver};
use crate::infrastructure::config::Config;

/// Exit status for a fatal startup or connection failure
pub const EXIT_FATAL: i32 = 1;
/// Exit status when the core module cannot be loaded
pub const EXIT_CORE_MODULE_FAILED: i32 = 2;
/// Exit status asking the launcher to start the bot again
pub const EXIT_RESTART: i32 = 26;

/// How the process should end once the message loop stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    Shutdown,
    Restart,
}

impl ShutdownMode {
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownMode::Shutdown => 0,
            ShutdownMode::Restart => EXIT_RESTART,
        }
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    messages_read: AtomicU64,
    processed_commands: AtomicU64,
    session_resumed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub messages_read: u64,
    pub processed_commands: u64,
    pub session_resumed: u64,
}

impl Counters {
    pub fn message_read(&self) {
        self.messages_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.processed_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_resumed(&self) {
        self.session_resumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            messages_read: self.messages_read.load(Ordering::Relaxed),
            processed_commands: self.processed_commands.load(Ordering::Relaxed),
            session_resumed: self.session_resumed.load(Ordering::Relaxed),
        }
    }
}

/// Operational status, as shown by the startup banner and `stats`
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub active_cogs: usize,
    pub total_cogs: usize,
    pub commands: usize,
    pub counters: CounterSnapshot,
    pub uptime: chrono::Duration,
}

impl SessionStatus {
    pub fn summary(&self) -> String {
        format!(
            "{}/{} active modules with {} commands",
            self.active_cogs, self.total_cogs, self.commands
        )
    }
}

/// Format a duration as `1d 2h 3m 4s`, dropping leading zero units
pub fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (days, hours, minutes, seconds) = (total / 86_400, total % 86_400 / 3_600, total % 3_600 / 60, total % 60);
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", seconds));
    parts.join(" ")
}

pub struct Session {
    config: Arc<Config>,
    registry: Arc<RwLock<CommandRegistry>>,
    cogs: CogManager,
    disabled: DisabledCommands,
    dispatcher: MessageDispatcher,
    counters: Counters,
    started_at: DateTime<Utc>,
    transport: Arc<dyn Bot>,
    shutdown: watch::Sender<Option<ShutdownMode>>,
}

impl Session {
    /// Build the session and read persisted state. No cog is loaded yet.
    pub async fn new(
        config: Arc<Config>,
        store: Arc<dyn DocumentStore>,
        resolver: Arc<dyn ModuleResolver>,
        transport: Arc<dyn Bot>,
        prompt: Option<Arc<dyn ModulePrompt>>,
    ) -> Result<Arc<Self>, ConfigError> {
        let registry = Arc::new(RwLock::new(CommandRegistry::new()));
        let entry_store = CogRegistryStore::new(store.clone(), config.cogs.registry_file.clone());

        let mut cogs = CogManager::new(
            config.core_module()?,
            resolver,
            config.clone(),
            registry.clone(),
            entry_store,
        )
        .await;
        if let Some(prompt) = prompt {
            cogs = cogs.with_prompt(prompt);
        }

        let disabled = DisabledCommands::load(store, config.cogs.disabled_commands_file.clone()).await;
        let (shutdown, _) = watch::channel(None);

        Ok(Arc::new(Self {
            dispatcher: MessageDispatcher::new(config.bot.prefixes.clone()),
            config,
            registry,
            cogs,
            disabled,
            counters: Counters::default(),
            started_at: Utc::now(),
            transport,
            shutdown,
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &RwLock<CommandRegistry> {
        &self.registry
    }

    pub fn cogs(&self) -> &CogManager {
        &self.cogs
    }

    pub fn disabled(&self) -> &DisabledCommands {
        &self.disabled
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn transport(&self) -> &Arc<dyn Bot> {
        &self.transport
    }

    /// Load the core module and every enabled cog.
    pub async fn start_cogs(&self, options: &LoadAllOptions) -> Result<LoadAllReport, StartupError> {
        let discovered = self.cogs.discover();
        tracing::info!("Discovered {} modules", discovered.len());
        self.cogs.load_all(&discovered, options).await
    }

    /// Route one inbound message; returns the reply to send, if any.
    pub async fn handle_message(self: &Arc<Self>, message: Message) -> Result<Option<String>, BotError> {
        self.dispatcher.dispatch(self, message).await
    }

    /// Whether the author of `message` may run owner commands
    pub fn is_owner(&self, message: &Message) -> bool {
        if message.platform == "console" {
            return true;
        }
        match (&self.config.bot.owner, message.sender_id()) {
            (Some(owner), Some(sender)) => owner == sender,
            _ => false,
        }
    }

    pub async fn status(&self) -> SessionStatus {
        let cogs = self.cogs.status().await;
        SessionStatus {
            active_cogs: cogs.iter().filter(|c| c.loaded).count(),
            total_cogs: cogs.len(),
            commands: self.registry.read().await.len(),
            counters: self.counters.snapshot(),
            uptime: Utc::now() - self.started_at,
        }
    }

    pub fn request_shutdown(&self, mode: ShutdownMode) {
        tracing::info!("Shutdown requested ({:?})", mode);
        self.shutdown.send_replace(Some(mode));
    }

    pub fn shutdown_mode(&self) -> Option<ShutdownMode> {
        *self.shutdown.borrow()
    }

    /// Resolves once `request_shutdown` has been called
    pub async fn wait_for_shutdown(&self) -> ShutdownMode {
        let mut rx = self.shutdown.subscribe();
        loop {
            if let Some(mode) = *rx.borrow_and_update() {
                return mode;
            }
            if rx.changed().await.is_err() {
                return ShutdownMode::Shutdown;
            }
        }
    }

    /// Tear down every cog. Called once when the process exits.
    pub async fn close(&self) {
        self.cogs.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cogs::testing::{id, RecordingBot, TestSetup};
    use crate::domain::entities::User;
    use crate::infrastructure::cogs::StaticResolver;
    use crate::infrastructure::config::DefaultPolicy;
    use crate::infrastructure::storage::MemoryStore;

    async fn session(owner: Option<&str>) -> Arc<Session> {
        let mut config = Config::default();
        config.bot.owner = owner.map(|o| o.to_string());
        let resolver = StaticResolver::new()
            .with_module(id("cogs.owner"), TestSetup::new(&["load"]))
            .with_module(id("cogs.general"), TestSetup::new(&["ping"]));
        Session::new(
            Arc::new(config),
            Arc::new(MemoryStore::new()),
            Arc::new(resolver),
            Arc::new(RecordingBot::default()),
            None,
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(5)), "5s");
        assert_eq!(format_duration(chrono::Duration::seconds(3_725)), "1h 2m 5s");
        assert_eq!(format_duration(chrono::Duration::seconds(90_000)), "1d 1h 0m 0s");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ShutdownMode::Shutdown.exit_code(), 0);
        assert_eq!(ShutdownMode::Restart.exit_code(), EXIT_RESTART);
        assert_ne!(EXIT_CORE_MODULE_FAILED, EXIT_FATAL);
    }

    #[tokio::test]
    async fn test_status_after_startup() {
        let session = session(None).await;
        let options = LoadAllOptions {
            no_cogs: false,
            defaults: vec![id("cogs.general")],
            policy: DefaultPolicy::Disable,
        };
        session.start_cogs(&options).await.unwrap();

        let status = session.status().await;
        assert_eq!(status.summary(), "2/2 active modules with 2 commands");
    }

    #[tokio::test]
    async fn test_is_owner() {
        let session = session(Some("42")).await;
        let owner = Message::from_text("1", "hi").with_sender(User::new("42")).with_platform("telegram");
        let other = Message::from_text("1", "hi").with_sender(User::new("7")).with_platform("telegram");
        let console = Message::from_text("console", "hi").with_platform("console");

        assert!(session.is_owner(&owner));
        assert!(!session.is_owner(&other));
        assert!(session.is_owner(&console));
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let session = session(None).await;
        assert_eq!(session.shutdown_mode(), None);

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_for_shutdown().await })
        };
        session.request_shutdown(ShutdownMode::Restart);

        assert_eq!(waiter.await.unwrap(), ShutdownMode::Restart);
        assert_eq!(session.shutdown_mode(), Some(ShutdownMode::Restart));
    }
}
