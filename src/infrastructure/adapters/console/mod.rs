//! Console adapter for development and local administration

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::application::errors::BotError;
use crate::domain::entities::{Message, User};
use crate::domain::traits::{Bot, BotInfo};

/// Platform tag of console messages; console users are always the owner
pub const CONSOLE_PLATFORM: &str = "console";

/// Console bot adapter: one stdin line is one inbound message
pub struct ConsoleAdapter {
    info: BotInfo,
    input: Mutex<BufReader<Stdin>>,
}

impl ConsoleAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: BotInfo {
                id: CONSOLE_PLATFORM.to_string(),
                name: name.into(),
                username: CONSOLE_PLATFORM.to_string(),
            },
            input: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    /// Turn one input line into a message, skipping blank lines
    pub fn message_from_line(line: &str) -> Option<Message> {
        let text = line.trim();
        if text.is_empty() {
            return None;
        }
        let sender = User::new(CONSOLE_PLATFORM).with_username("owner");
        Some(
            Message::from_text(CONSOLE_PLATFORM, text)
                .with_sender(sender)
                .with_platform(CONSOLE_PLATFORM),
        )
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting console bot, type commands on stdin");
        Ok(())
    }

    async fn poll(&self) -> Result<Vec<Message>, BotError> {
        let mut input = self.input.lock().await;
        loop {
            let mut line = String::new();
            let read = input
                .read_line(&mut line)
                .await
                .map_err(|e| BotError::Internal(format!("stdin: {}", e)))?;
            if read == 0 {
                return Err(BotError::Disconnected);
            }
            if let Some(message) = Self::message_from_line(&line) {
                return Ok(vec![message]);
            }
        }
    }

    async fn send_message(&self, _chat_id: &str, text: &str) -> Result<String, BotError> {
        println!("[{}] {}", self.info.name, text);
        Ok(uuid::Uuid::new_v4().to_string())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Content;

    #[test]
    fn test_lines_become_owner_messages() {
        let message = ConsoleAdapter::message_from_line("!load general\n").unwrap();
        assert_eq!(message.platform, CONSOLE_PLATFORM);
        assert_eq!(message.content, Content::Text("!load general".to_string()));
        assert_eq!(message.sender_id(), Some(CONSOLE_PLATFORM));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert!(ConsoleAdapter::message_from_line("   \n").is_none());
    }
}
