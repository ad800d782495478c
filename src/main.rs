use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use chronoxia::application::cogs::LoadAllOptions;
use chronoxia::application::errors::StartupError;
use chronoxia::application::services::MessageService;
use chronoxia::application::session::{
    Session, ShutdownMode, EXIT_CORE_MODULE_FAILED, EXIT_FATAL,
};
use chronoxia::cogs::builtin_resolver;
use chronoxia::domain::traits::{Bot, ModulePrompt};
use chronoxia::infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use chronoxia::infrastructure::cogs::StdinPrompt;
use chronoxia::infrastructure::config::{Config, TelegramConfig};
use chronoxia::infrastructure::storage::JsonFileStore;

#[derive(Parser)]
#[command(name = "chronoxia")]
#[command(about = "A chat bot with hot-reloadable command modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long, global = true)]
    token: Option<String>,

    /// Load only the core module
    #[arg(long, global = true)]
    no_cogs: bool,

    /// Load modules, then quit without logging in
    #[arg(long, global = true)]
    dry_run: bool,

    /// Never ask about newly found modules
    #[arg(long, global = true)]
    no_prompt: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            std::process::exit(run_bot(&cli));
        }
        Commands::Version => {
            println!("chronoxia v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_logging(cli.debug);
            init_config(&cli.config);
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.into()),
        )
        .init();
}

fn load_config(path: &str) -> (Config, Option<String>) {
    if !Path::new(path).exists() {
        return (Config::load_env(), None);
    }
    match Config::load(path) {
        Ok(config) => (config, None),
        Err(e) => (Config::load_env(), Some(e.to_string())),
    }
}

fn run_bot(cli: &Cli) -> i32 {
    let (mut config, load_error) = load_config(&cli.config);
    if let Some(token) = &cli.token {
        config.adapters.telegram = Some(TelegramConfig {
            enabled: true,
            token: Some(token.clone()),
        });
    }

    init_logging(cli.debug || config.bot.debug);
    if let Some(e) = load_error {
        warn!("Failed to load config: {}, using defaults", e);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return EXIT_FATAL;
        }
    };
    rt.block_on(run(cli, Arc::new(config)))
}

async fn run(cli: &Cli, config: Arc<Config>) -> i32 {
    info!("Starting {}", config.bot.name);

    let store = JsonFileStore::new(&config.bot.data_dir);
    if let Err(e) = store.init().await {
        error!("Failed to create {}: {}", config.bot.data_dir.display(), e);
        return EXIT_FATAL;
    }

    let resolver = match builtin_resolver() {
        Ok(resolver) => resolver,
        Err(e) => {
            error!("Failed to build module registry: {}", e);
            return EXIT_FATAL;
        }
    };

    let Some(transport) = select_transport(&config) else {
        error!("No credentials available to login.");
        return EXIT_FATAL;
    };

    let prompt: Option<Arc<dyn ModulePrompt>> = if cli.no_prompt {
        None
    } else {
        Some(Arc::new(StdinPrompt))
    };

    let session = match Session::new(
        config.clone(),
        Arc::new(store),
        Arc::new(resolver),
        transport.clone(),
        prompt,
    )
    .await
    {
        Ok(session) => session,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return EXIT_FATAL;
        }
    };

    let mut options = match LoadAllOptions::from_config(&config) {
        Ok(options) => options,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return EXIT_FATAL;
        }
    };
    options.no_cogs = cli.no_cogs;

    match session.start_cogs(&options).await {
        Ok(report) => info!("Loaded {} modules", report.loaded.len()),
        Err(e @ StartupError::CoreModule { .. }) => {
            error!("{}", e);
            return EXIT_CORE_MODULE_FAILED;
        }
        Err(e) => {
            error!("Startup failed: {}", e);
            return EXIT_FATAL;
        }
    }

    if cli.dry_run {
        info!("Quitting: dry run");
        session.close().await;
        return 0;
    }

    info!("Logging in...");
    if let Err(e) = transport.start().await {
        error!("Login failed: {}", e);
        session.close().await;
        return EXIT_FATAL;
    }
    print_banner(&session).await;

    // Ctrl-C only raises the shutdown signal; the loop stops between messages.
    let interrupt = {
        let session = session.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, shutting down");
                session.request_shutdown(ShutdownMode::Shutdown);
            }
        })
    };
    let mode = MessageService::new(session.clone()).run().await;
    interrupt.abort();

    session.close().await;
    info!("Exiting ({:?})", mode);
    mode.exit_code()
}

/// Telegram when a token is configured, the console otherwise
fn select_transport(config: &Config) -> Option<Arc<dyn Bot>> {
    if let Some(token) = config.telegram_token() {
        return Some(Arc::new(TelegramAdapter::new(token)));
    }
    let console_enabled = config.adapters.console.as_ref().map_or(true, |c| c.enabled);
    if console_enabled {
        info!("No Telegram token configured, reading commands from the console");
        return Some(Arc::new(ConsoleAdapter::new(config.bot.name.clone())));
    }
    None
}

async fn print_banner(session: &Session) {
    let info = session.transport().bot_info();
    let status = session.status().await;
    let config = session.config();

    println!("-----------------");
    println!("Chronoxia - Chat Bot");
    println!("-----------------");
    println!("{} (@{})", info.name, info.username);
    println!("Prefixes: {} /", config.bot.prefixes.join(" "));
    println!("Owner: {}", config.bot.owner.as_deref().unwrap_or("not set"));
    println!("{}", status.summary());
    println!("-----------------");
}

fn init_config(path: &str) {
    let yaml = match Config::default().to_yaml() {
        Ok(yaml) => yaml,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    if Path::new(path).exists() {
        println!("{}", yaml);
        println!("\n{} already exists; merge the defaults above by hand.", path);
        return;
    }
    match std::fs::write(path, &yaml) {
        Ok(()) => println!("Wrote default config to {}", path),
        Err(e) => error!("Failed to write {}: {}", path, e),
    }
}
