//! Telegram Bot API adapter for delivering reminders.
//!
//! Sends plain text messages to one configured chat.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{DeliveryError, NotificationDispatcher};

const SERVICE: &str = "Telegram";

/// Telegram Bot API client
pub struct TelegramClient {
    /// Bot token
    bot_token: String,
    /// Target chat ID
    chat_id: String,
    /// API root (overridable for tests)
    api_base: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Response from Telegram API
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Message result from sendMessage
#[derive(Debug, Deserialize)]
struct MessageResult {
    message_id: i64,
}

/// Configuration for Telegram client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramClient {
    /// Create a new Telegram client
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            api_base: "https://api.telegram.org".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from config
    pub fn from_config(config: TelegramConfig) -> Self {
        Self::new(config.bot_token, config.chat_id)
    }

    /// Point the client at a different API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Build API URL
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Send a text message, returning its message id
    pub async fn send_message(&self, text: &str) -> Result<i64, DeliveryError> {
        let url = self.api_url("sendMessage");

        let transport = |source: reqwest::Error| DeliveryError::Transport {
            service: SERVICE,
            source,
        };

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
            }))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let result: TelegramResponse<MessageResult> =
            response.json().await.map_err(transport)?;

        if !result.ok {
            return Err(DeliveryError::Api {
                service: SERVICE,
                status,
                message: result.description.unwrap_or_default(),
            });
        }

        Ok(result.result.map(|r| r.message_id).unwrap_or(0))
    }
}

#[async_trait]
impl NotificationDispatcher for TelegramClient {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<(), DeliveryError> {
        let message_id = self.send_message(message).await?;
        tracing::info!(message_id, "Telegram message sent");
        Ok(())
    }
}
