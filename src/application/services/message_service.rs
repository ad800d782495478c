//! Message service - the receive/dispatch/reply loop

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::application::errors::BotError;
use crate::application::session::{Session, ShutdownMode};
use crate::domain::entities::Message;

/// Pause before polling again after a transport error
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Pulls messages from the session transport and answers them
pub struct MessageService {
    session: Arc<Session>,
}

impl MessageService {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Run until shutdown is requested or the transport closes
    pub async fn run(&self) -> ShutdownMode {
        let mut failing = false;
        loop {
            let batch = tokio::select! {
                mode = self.session.wait_for_shutdown() => return mode,
                batch = self.session.transport().poll() => batch,
            };

            match batch {
                Ok(messages) => {
                    if failing {
                        failing = false;
                        self.session.counters().session_resumed();
                        info!("Connection resumed");
                    }
                    for message in messages {
                        self.process(message).await;
                        if let Some(mode) = self.session.shutdown_mode() {
                            return mode;
                        }
                    }
                }
                Err(BotError::Disconnected) => {
                    info!("Transport closed");
                    return self.session.shutdown_mode().unwrap_or(ShutdownMode::Shutdown);
                }
                Err(e) => {
                    failing = true;
                    warn!("Polling failed: {}. Retrying in {}s", e, RETRY_DELAY.as_secs());
                    tokio::select! {
                        mode = self.session.wait_for_shutdown() => return mode,
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                    }
                }
            }
        }
    }

    /// Dispatch one message and send the reply, if any
    pub async fn process(&self, message: Message) {
        let chat_id = message.chat_id.clone();
        debug!("Processing message {} from {}", message.id, chat_id);

        let reply = match self.session.handle_message(message).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(e) => {
                error!("Failed to handle message: {}", e);
                return;
            }
        };

        if let Err(e) = self.respond(&chat_id, &reply).await {
            error!("Failed to send reply to {}: {}", chat_id, e);
        }
    }

    pub async fn respond(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        self.session.transport().send_message(chat_id, text).await
    }
}
