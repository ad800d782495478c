//! Cog lifecycle integration tests, driven through chat commands
//! Run with: cargo test --test cog_lifecycle_test

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use chronoxia::application::cogs::LoadAllOptions;
use chronoxia::application::errors::{BotError, CommandError};
use chronoxia::application::messaging::dispatcher::DISABLED_REPLY;
use chronoxia::application::services::MessageService;
use chronoxia::application::session::{Session, ShutdownMode};
use chronoxia::cogs::builtin_resolver;
use chronoxia::domain::entities::{Command, CommandContext, Message, ModuleId, User};
use chronoxia::domain::traits::{Bot, BotInfo, Cog, CogSetup, DocumentStore, SetupContext};
use chronoxia::infrastructure::cogs::StaticResolver;
use chronoxia::infrastructure::config::Config;
use chronoxia::infrastructure::storage::MemoryStore;

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn id(raw: &str) -> ModuleId {
    ModuleId::parse(raw).unwrap()
}

struct Weather {
    teardowns: Arc<AtomicUsize>,
}

#[async_trait]
impl Cog for Weather {
    fn name(&self) -> &str {
        "Weather"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new("forecast")
            .with_description("Tomorrow's weather")
            .with_handler(|_ctx: CommandContext| async move { Ok::<_, CommandError>("Sunny.".to_string()) })]
    }

    async fn teardown(&self) -> Result<(), String> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct WeatherSetup {
    broken: Arc<AtomicBool>,
    teardowns: Arc<AtomicUsize>,
}

#[async_trait]
impl CogSetup for WeatherSetup {
    async fn setup(&self, _ctx: &SetupContext) -> Result<Box<dyn Cog>, String> {
        if self.broken.load(Ordering::SeqCst) {
            return Err("weather service unreachable".to_string());
        }
        Ok(Box::new(Weather {
            teardowns: self.teardowns.clone(),
        }))
    }
}

/// Defines `ping`, which the general cog already owns
struct ClashSetup;

struct Clash;

#[async_trait]
impl Cog for Clash {
    fn name(&self) -> &str {
        "Clash"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("clash").with_handler(|_ctx: CommandContext| async move { Ok::<_, CommandError>("!".to_string()) }),
            Command::new("ping").with_handler(|_ctx: CommandContext| async move { Ok::<_, CommandError>("pong?".to_string()) }),
        ]
    }
}

#[async_trait]
impl CogSetup for ClashSetup {
    async fn setup(&self, _ctx: &SetupContext) -> Result<Box<dyn Cog>, String> {
        Ok(Box::new(Clash))
    }
}

/// Blocks inside setup until released
#[derive(Clone, Default)]
struct GatedSetup {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl CogSetup for GatedSetup {
    async fn setup(&self, _ctx: &SetupContext) -> Result<Box<dyn Cog>, String> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(Box::new(Weather {
            teardowns: Arc::new(AtomicUsize::new(0)),
        }))
    }
}

/// Yields scripted batches, then reports the transport closed
#[derive(Default)]
struct ScriptedBot {
    inbound: Mutex<VecDeque<Vec<Message>>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl ScriptedBot {
    fn with_script(lines: &[&str]) -> Self {
        let bot = Self::default();
        bot.inbound
            .lock()
            .unwrap()
            .extend(lines.iter().map(|line| vec![console(line)]));
        bot
    }

    fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl Bot for ScriptedBot {
    async fn start(&self) -> Result<(), BotError> {
        Ok(())
    }

    async fn poll(&self) -> Result<Vec<Message>, BotError> {
        self.inbound
            .lock()
            .map_err(|_| BotError::Internal("lock poisoned".to_string()))?
            .pop_front()
            .ok_or(BotError::Disconnected)
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        self.sent.lock().unwrap().push((chat_id.to_string(), text.to_string()));
        Ok("1".to_string())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: "0".to_string(),
            name: "chronoxia".to_string(),
            username: "chronoxia_bot".to_string(),
        }
    }
}

fn console(text: &str) -> Message {
    Message::from_text("console", text).with_platform("console")
}

struct Harness {
    session: Arc<Session>,
    store: Arc<MemoryStore>,
    bot: Arc<ScriptedBot>,
    weather: WeatherSetup,
}

impl Harness {
    async fn start(bot: ScriptedBot) -> Self {
        ensure_init();
        let mut config = Config::default();
        config.bot.owner = Some("42".to_string());

        let weather = WeatherSetup::default();
        let resolver = builtin_resolver()
            .unwrap()
            .with_module(id("cogs.weather"), weather.clone())
            .with_module(id("cogs.clash"), ClashSetup);

        let store = Arc::new(MemoryStore::new());
        let bot = Arc::new(bot);
        let config = Arc::new(config);
        let session = Session::new(config.clone(), store.clone(), Arc::new(resolver), bot.clone(), None)
            .await
            .unwrap();
        session
            .start_cogs(&LoadAllOptions::from_config(&config).unwrap())
            .await
            .unwrap();

        Self {
            session,
            store,
            bot,
            weather,
        }
    }

    async fn say(&self, text: &str) -> Option<String> {
        self.session.handle_message(console(text)).await.unwrap()
    }

    async fn entries(&self) -> serde_json::Value {
        self.store.load("cogs.json").await
    }
}

#[tokio::test]
async fn test_first_run_loads_core_and_defaults() {
    let h = Harness::start(ScriptedBot::default()).await;

    let loaded: Vec<String> = h.session.cogs().loaded_ids().await.iter().map(|i| i.to_string()).collect();
    assert_eq!(loaded, vec!["cogs.general", "cogs.owner"]);
    assert_eq!(
        h.entries().await,
        json!({"cogs.clash": false, "cogs.general": true, "cogs.weather": false})
    );
    assert_eq!(h.session.status().await.summary(), "2/4 active modules with 14 commands");
}

#[tokio::test]
async fn test_load_and_unload_through_chat() {
    let h = Harness::start(ScriptedBot::default()).await;

    assert_eq!(h.say("!load weather").await.as_deref(), Some("Module enabled."));
    assert_eq!(h.say("!forecast").await.as_deref(), Some("Sunny."));
    assert_eq!(h.entries().await["cogs.weather"], json!(true));

    assert_eq!(h.say("!load weather").await.as_deref(), Some("That module is already loaded. Use reload instead."));

    assert_eq!(h.say("!unload cogs.weather").await.as_deref(), Some("Module disabled."));
    assert_eq!(h.say("!forecast").await, None);
    assert_eq!(h.entries().await["cogs.weather"], json!(false));
    assert_eq!(h.weather.teardowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_owner_module_is_protected_but_reloadable() {
    let h = Harness::start(ScriptedBot::default()).await;

    assert_eq!(
        h.say("!unload owner").await.as_deref(),
        Some("The owner module cannot be unloaded. Reload it instead.")
    );
    assert_eq!(h.say("!reload owner").await.as_deref(), Some("Module reloaded."));
    assert!(h.session.cogs().is_loaded(&id("cogs.owner")).await);

    assert_eq!(h.say("!unload all").await.as_deref(), Some("1 modules unloaded."));
    assert_eq!(h.session.cogs().loaded_ids().await, vec![id("cogs.owner")]);
    assert_eq!(h.say("!ping").await, None);
}

#[tokio::test]
async fn test_bad_module_names_and_missing_arguments() {
    let h = Harness::start(ScriptedBot::default()).await;

    assert_eq!(h.say("!load nonexistent").await.as_deref(), Some("That module could not be found."));
    assert_eq!(h.say("!unload weather").await.as_deref(), Some("That module is not loaded."));
    assert_eq!(h.say("!load not-a-module").await.as_deref(), Some("'cogs.not-a-module' doesn't look like a module name."));
    assert_eq!(h.say("!load").await.as_deref(), Some("Usage: !load <module>"));
}

#[tokio::test]
async fn test_duplicate_command_keeps_first_owner() {
    let h = Harness::start(ScriptedBot::default()).await;

    let reply = h.say("!load clash").await.unwrap();
    assert!(reply.contains("'ping' is already registered"), "{}", reply);
    assert!(!h.session.cogs().is_loaded(&id("cogs.clash")).await);
    assert_eq!(h.say("!clash").await, None);
    assert_eq!(h.say("!ping").await.as_deref(), Some("Pong."));
}

#[tokio::test]
async fn test_failed_reload_leaves_module_unloaded() {
    let h = Harness::start(ScriptedBot::default()).await;
    h.say("!load weather").await;

    h.weather.broken.store(true, Ordering::SeqCst);
    let reply = h.say("!reload weather").await.unwrap();
    assert!(reply.contains("weather service unreachable"), "{}", reply);

    assert_eq!(h.say("!forecast").await, None);
    assert!(!h.session.cogs().is_loaded(&id("cogs.weather")).await);
    assert_eq!(h.entries().await["cogs.weather"], json!(true));

    h.weather.broken.store(false, Ordering::SeqCst);
    assert_eq!(h.say("!reload weather").await.as_deref(), Some("Module reloaded."));
    assert_eq!(h.say("!forecast").await.as_deref(), Some("Sunny."));
}

#[tokio::test]
async fn test_strangers_cannot_administer() {
    let h = Harness::start(ScriptedBot::default()).await;
    let stranger = Message::from_text("-100", "!load weather")
        .with_sender(User::new("7"))
        .with_platform("telegram");

    assert_eq!(h.session.handle_message(stranger).await.unwrap(), None);
    assert!(!h.session.cogs().is_loaded(&id("cogs.weather")).await);

    let stranger = Message::from_text("-100", "!ping")
        .with_sender(User::new("7"))
        .with_platform("telegram");
    assert_eq!(h.session.handle_message(stranger).await.unwrap().as_deref(), Some("Pong."));
}

#[tokio::test]
async fn test_disable_and_enable() {
    let h = Harness::start(ScriptedBot::default()).await;

    assert_eq!(h.say("!disable ping").await.as_deref(), Some("'ping' has been disabled."));
    assert_eq!(h.say("!ping").await.as_deref(), Some(DISABLED_REPLY));
    assert_eq!(h.store.load("disabled_commands.json").await, json!({"ping": true}));

    assert_eq!(h.say("!disable general").await.as_deref(), Some("'cogs.general' has been disabled."));
    assert_eq!(h.say("!say hi").await.as_deref(), Some(DISABLED_REPLY));

    assert_eq!(
        h.say("!disable load").await.as_deref(),
        Some("Commands of the owner module can't be disabled.")
    );
    assert_eq!(h.say("!disable nothing_here").await.as_deref(), Some("That command doesn't exist."));

    assert_eq!(h.say("!enable general").await.as_deref(), Some("'cogs.general' has been enabled."));
    assert_eq!(h.say("!enable ping").await.as_deref(), Some("'ping' has been enabled."));
    assert_eq!(h.say("!ping").await.as_deref(), Some("Pong."));

    h.session.disabled().disable("cogs.retired").await.unwrap();
    assert_eq!(h.say("!enable retired").await.as_deref(), Some("'cogs.retired' has been enabled."));
    assert_eq!(h.store.load("disabled_commands.json").await, json!({}));
}

#[tokio::test]
async fn test_help_and_cogs_listing() {
    let h = Harness::start(ScriptedBot::default()).await;

    assert_eq!(
        h.say("!help say").await.as_deref(),
        Some("Usage: say <text>\nRepeat a message\nAliases: echo")
    );
    assert_eq!(h.say("!help nope").await.as_deref(), Some("No command called 'nope'."));

    let listing = h.say("!help").await.unwrap();
    assert!(listing.starts_with("general:\n"), "{}", listing);
    assert!(listing.contains("  reload - Reload a module"), "{}", listing);

    assert_eq!(
        h.say("!cogs").await.as_deref(),
        Some("Loaded: general, owner\nUnloaded: clash, weather")
    );
}

#[tokio::test]
async fn test_message_loop_runs_until_restart() {
    let h = Harness::start(ScriptedBot::with_script(&["!ping", "hello", "!restart", "!ping"])).await;

    let mode = MessageService::new(h.session.clone()).run().await;
    assert_eq!(mode, ShutdownMode::Restart);
    assert_eq!(mode.exit_code(), 26);
    assert_eq!(h.bot.sent_texts(), vec!["Pong.", "Restarting..."]);

    let counters = h.session.counters().snapshot();
    assert_eq!(counters.messages_read, 3);
    assert_eq!(counters.processed_commands, 2);
}

#[tokio::test]
async fn test_message_loop_stops_when_transport_closes() {
    let h = Harness::start(ScriptedBot::with_script(&["!load weather"])).await;

    let mode = MessageService::new(h.session.clone()).run().await;
    assert_eq!(mode, ShutdownMode::Shutdown);
    assert_eq!(h.bot.sent_texts(), vec!["Module enabled."]);

    h.session.close().await;
    assert!(h.session.cogs().loaded_ids().await.is_empty());
    assert_eq!(h.weather.teardowns.load(Ordering::SeqCst), 1);
    assert_eq!(h.entries().await["cogs.weather"], json!(true));
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_load() {
    ensure_init();
    let gated = GatedSetup::default();
    let resolver = StaticResolver::new()
        .with_module(id("cogs.owner"), chronoxia::cogs::owner::OwnerSetup)
        .with_module(id("cogs.slow"), gated.clone());
    let config = Arc::new(Config::default());
    let bot = Arc::new(ScriptedBot::with_script(&["!load slow", "!help"]));
    let session = Session::new(config.clone(), Arc::new(MemoryStore::new()), Arc::new(resolver), bot.clone(), None)
        .await
        .unwrap();
    session
        .start_cogs(&LoadAllOptions::from_config(&config).unwrap())
        .await
        .unwrap();

    let service = MessageService::new(session.clone());
    let running = tokio::spawn(async move { service.run().await });

    gated.started.notified().await;
    session.request_shutdown(ShutdownMode::Shutdown);
    gated.release.notify_one();

    let mode = running.await.unwrap();
    assert_eq!(mode, ShutdownMode::Shutdown);
    assert_eq!(bot.sent_texts(), vec!["Module enabled."]);
    assert!(session.cogs().is_loaded(&id("cogs.slow")).await);
    assert!(session.registry().read().await.dispatch("forecast").is_some());
}
