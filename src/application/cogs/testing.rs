//! Test fixtures shared by the lifecycle and session tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::application::errors::{BotError, CommandError};
use crate::domain::entities::{Command, CommandContext, Message, ModuleId};
use crate::domain::traits::{Bot, BotInfo, Cog, CogSetup, SetupContext};

pub(crate) fn id(raw: &str) -> ModuleId {
    ModuleId::parse(raw).unwrap()
}

pub(crate) struct TestCog {
    name: String,
    commands: Vec<String>,
    teardown_fails: bool,
    teardowns: Arc<AtomicUsize>,
}

#[async_trait]
impl Cog for TestCog {
    fn name(&self) -> &str {
        &self.name
    }

    fn commands(&self) -> Vec<Command> {
        self.commands
            .iter()
            .map(|name| {
                Command::new(name.as_str()).with_handler(|ctx: CommandContext| async move {
                    Ok::<_, CommandError>(format!("{} ok", ctx.command))
                })
            })
            .collect()
    }

    async fn teardown(&self) -> Result<(), String> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        if self.teardown_fails {
            Err("session close failed".to_string())
        } else {
            Ok(())
        }
    }
}

/// Builds a `TestCog`, or fails with a fixed cause
#[derive(Clone)]
pub(crate) struct TestSetup {
    commands: Vec<String>,
    failure: Option<String>,
    teardown_fails: bool,
    /// Flip to make every later setup fail
    pub broken: Arc<AtomicBool>,
    pub setups: Arc<AtomicUsize>,
    pub teardowns: Arc<AtomicUsize>,
}

impl TestSetup {
    pub(crate) fn new(commands: &[&str]) -> Self {
        Self {
            commands: commands.iter().map(|c| c.to_string()).collect(),
            failure: None,
            teardown_fails: false,
            broken: Arc::new(AtomicBool::new(false)),
            setups: Arc::new(AtomicUsize::new(0)),
            teardowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing(mut self, cause: &str) -> Self {
        self.failure = Some(cause.to_string());
        self
    }

    pub(crate) fn failing_teardown(mut self) -> Self {
        self.teardown_fails = true;
        self
    }
}

#[async_trait]
impl CogSetup for TestSetup {
    async fn setup(&self, ctx: &SetupContext) -> Result<Box<dyn Cog>, String> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        if let Some(cause) = &self.failure {
            return Err(cause.clone());
        }
        if self.broken.load(Ordering::SeqCst) {
            return Err("module is broken".to_string());
        }
        Ok(Box::new(TestCog {
            name: ctx.id.short_name().to_string(),
            commands: self.commands.clone(),
            teardown_fails: self.teardown_fails,
            teardowns: self.teardowns.clone(),
        }))
    }
}

/// Transport that records outbound messages and never yields inbound ones
#[derive(Default)]
pub(crate) struct RecordingBot {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Bot for RecordingBot {
    async fn start(&self) -> Result<(), BotError> {
        Ok(())
    }

    async fn poll(&self) -> Result<Vec<Message>, BotError> {
        Err(BotError::Disconnected)
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        let mut sent = self.sent.lock().map_err(|_| BotError::Internal("lock poisoned".to_string()))?;
        sent.push((chat_id.to_string(), text.to_string()));
        Ok(sent.len().to_string())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: "0".to_string(),
            name: "recorder".to_string(),
            username: "recorder".to_string(),
        }
    }
}
