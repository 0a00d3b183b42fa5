//! Telegram Bot API notification channel.
//!
//! Sends messages via the Telegram Bot API (`POST /bot<token>/sendMessage`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{ChannelKind, DeliveryResult, NotificationChannel, mask, post_json, split_recipients};
use crate::Result;
use crate::notification::composer::RenderedMessage;

/// Telegram `sendMessage` text limit (UTF-8 characters).
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Telegram channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Telegram Bot API token.
    pub token: String,
    /// Target chat IDs, comma separated.
    pub chat_id: String,
    /// Bot API base URL.
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl TelegramConfig {
    pub fn is_complete(&self) -> bool {
        !self.token.trim().is_empty() && !split_recipients(&self.chat_id).is_empty()
    }
}

/// Telegram notification channel.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.token.trim()
        )
    }

    async fn send_to(&self, chat_id: &str, text: &str) -> Result<()> {
        let payload = json!({ "chat_id": chat_id, "text": text });
        let body =
            post_json(&self.client, ChannelKind::Telegram, &self.endpoint(), &payload).await?;
        if body.get("ok").and_then(|v| v.as_bool()) == Some(true) {
            Ok(())
        } else {
            Err(crate::Error::channel(
                ChannelKind::Telegram.label(),
                body.get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or("sendMessage returned ok=false")
                    .to_string(),
            ))
        }
    }
}

/// Truncates to at most `limit` characters, marking the cut with an ellipsis.
fn truncate_message(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    fn is_enabled(&self) -> bool {
        self.config.is_complete()
    }

    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryResult> {
        let text = truncate_message(&message.content, TELEGRAM_MESSAGE_LIMIT);
        let mut result = DeliveryResult::default();

        for chat_id in split_recipients(&self.config.chat_id) {
            match self.send_to(&chat_id, &text).await {
                Ok(()) => {
                    debug!(chat_id = %chat_id, "Telegram notification sent");
                    result.record(chat_id, true);
                }
                Err(e) => {
                    warn!(
                        chat_id = %chat_id,
                        token = %mask(&self.config.token),
                        error = %e,
                        "Telegram sendMessage failed"
                    );
                    result.record(chat_id, false);
                }
            }
        }

        Ok(result)
    }
}
