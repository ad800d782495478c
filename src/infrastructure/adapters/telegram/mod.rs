//! Telegram adapter

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;
use crate::domain::entities::{Message as ChatMessage, User as ChatUser};
use crate::domain::traits::{Bot, BotInfo};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Long-poll timeout passed to getUpdates, in seconds
const POLL_TIMEOUT: i64 = 30;

pub const TELEGRAM_PLATFORM: &str = "telegram";

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, BotError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(BotError::Network(
                self.description.unwrap_or_else(|| "Telegram API error".to_string()),
            )),
        }
    }
}

/// Telegram bot adapter
pub struct TelegramAdapter {
    token: String,
    client: Client,
    info: RwLock<BotInfo>,
    offset: AtomicI64,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            info: RwLock::new(BotInfo {
                id: "unknown".to_string(),
                name: "chronoxia".to_string(),
                username: "chronoxia".to_string(),
            }),
            offset: AtomicI64::new(0),
        }
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    async fn call<Req, Res>(&self, method: &str, request: &Req) -> Result<Res, BotError>
    where
        Req: Serialize + ?Sized,
        Res: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.api_url(method))
            .json(request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BotError::Auth("Telegram rejected the bot token".to_string()));
        }

        let data: ApiResponse<Res> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;
        data.into_result()
    }

    /// Fetch bot info from Telegram API
    pub async fn fetch_bot_info(&self) -> Result<BotInfo, BotError> {
        #[derive(Deserialize)]
        struct Me {
            id: i64,
            first_name: String,
            username: Option<String>,
        }

        let me: Me = self.call("getMe", &serde_json::json!({})).await?;
        let info = BotInfo {
            id: me.id.to_string(),
            username: me.username.unwrap_or_else(|| me.first_name.clone()),
            name: me.first_name,
        };
        if let Ok(mut slot) = self.info.write() {
            *slot = info.clone();
        }
        Ok(info)
    }

    /// Get updates from Telegram using getUpdates API
    pub async fn get_updates(&self, offset: i64, timeout: i64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: i64,
            allowed_updates: Vec<String>,
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message".to_string()],
        };
        self.call("getUpdates", &request).await
    }

    /// Get the next update offset
    pub fn next_offset(updates: &[Update]) -> Option<i64> {
        updates.iter().map(|u| u.update_id + 1).max()
    }

    /// Convert a Telegram update into a chat message; non-text updates are dropped
    pub fn to_message(update: &Update) -> Option<ChatMessage> {
        let message = update.message.as_ref()?;
        let text = message.text.as_ref()?;

        let mut chat_message = ChatMessage::from_text(message.chat.id.to_string(), text.clone())
            .with_platform(TELEGRAM_PLATFORM);
        if let Some(from) = &message.from {
            let mut user = ChatUser::new(from.id.to_string());
            if let Some(username) = &from.username {
                user = user.with_username(username.clone());
            }
            if let Some(name) = &from.first_name {
                user = user.with_display_name(name.clone());
            }
            if from.is_bot {
                user = user.bot();
            }
            chat_message = chat_message.with_sender(user);
        }
        Some(chat_message)
    }
}

#[async_trait]
impl Bot for TelegramAdapter {
    async fn start(&self) -> Result<(), BotError> {
        let info = self.fetch_bot_info().await?;
        tracing::info!("Logged in to Telegram as @{} ({})", info.username, info.id);
        Ok(())
    }

    async fn poll(&self) -> Result<Vec<ChatMessage>, BotError> {
        let updates = self.get_updates(self.offset.load(Ordering::SeqCst), POLL_TIMEOUT).await?;
        if let Some(next) = Self::next_offset(&updates) {
            self.offset.store(next, Ordering::SeqCst);
        }
        Ok(updates.iter().filter_map(Self::to_message).collect())
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: &'a str,
            text: &'a str,
        }

        #[derive(Deserialize)]
        struct MessageResult {
            message_id: i64,
        }

        tracing::debug!("Sending to {}: {}", chat_id, text);
        let result: MessageResult = self
            .call("sendMessage", &SendMessageRequest { chat_id, text })
            .await?;
        Ok(result.message_id.to_string())
    }

    fn bot_info(&self) -> BotInfo {
        match self.info.read() {
            Ok(info) => info.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
