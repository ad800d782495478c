//! Message parser - Parses raw messages into structured messages

use crate::domain::entities::{Content, Message};

/// Parses incoming text into command or plain-text messages
pub struct MessageParser {
    prefixes: Vec<String>,
}

impl MessageParser {
    pub fn new(prefixes: Vec<String>) -> Self {
        // Longest first, so "!!" wins over "!"
        let mut prefixes = prefixes;
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()));
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// The command prefix `text` starts with, `/` included
    fn strip_prefix<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.prefixes
            .iter()
            .find_map(|p| text.strip_prefix(p.as_str()))
            .or_else(|| text.strip_prefix('/'))
    }

    /// Turn a plain-text message that starts with a prefix into a command
    pub fn classify(&self, mut message: Message) -> Message {
        if let Content::Text(text) = &message.content {
            if let Some(command) = self.parse_command(text) {
                message.content = command;
            }
        }
        message
    }

    fn parse_command(&self, text: &str) -> Option<Content> {
        let rest = self.strip_prefix(text.trim_start())?;
        let mut parts = rest.split_whitespace();
        let first = parts.next()?;

        // Telegram addresses commands in groups as /name@botname
        let name = first.split('@').next().unwrap_or(first).to_lowercase();
        if name.is_empty() {
            return None;
        }

        Some(Content::Command {
            name,
            args: parts.map(|s| s.to_string()).collect(),
        })
    }
}
