//! Gotify application messages (`POST {url}/message` with `X-Gotify-Key`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{ChannelKind, DeliveryResult, NotificationChannel, mask};
use crate::notification::composer::RenderedMessage;
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GotifyConfig {
    /// Server base URL.
    pub url: String,
    /// Application token.
    pub token: String,
    /// Message priority (1-10).
    pub priority: u8,
}

impl Default for GotifyConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            priority: 5,
        }
    }
}

impl GotifyConfig {
    pub fn is_complete(&self) -> bool {
        !self.url.trim().is_empty() && !self.token.trim().is_empty()
    }
}

pub struct GotifyChannel {
    config: GotifyConfig,
    client: Client,
}

impl GotifyChannel {
    pub fn new(config: GotifyConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn post(&self, message: &RenderedMessage) -> Result<()> {
        let endpoint = format!("{}/message", self.config.url.trim().trim_end_matches('/'));
        let payload = json!({
            "title": message.title,
            "message": message.content,
            "priority": self.config.priority,
            "extras": { "client::notification": { "click": { "url": message.room_url } },
                        "client::display::url": message.room_url },
        });

        let response = self
            .client
            .post(&endpoint)
            .header("X-Gotify-Key", self.config.token.trim())
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();

        if status.is_success() && body.get("id").is_some() {
            return Ok(());
        }
        let reason = body
            .get("errorDescription")
            .or_else(|| body.get("error"))
            .map(|v| v.to_string())
            .unwrap_or_else(|| format!("unexpected response: {body}"));
        Err(Error::channel(
            ChannelKind::Gotify.label(),
            format!("HTTP {status}: {reason}"),
        ))
    }
}

#[async_trait]
impl NotificationChannel for GotifyChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Gotify
    }

    fn is_enabled(&self) -> bool {
        self.config.is_complete()
    }

    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryResult> {
        let mut result = DeliveryResult::default();
        let server = self.config.url.trim().to_string();

        match self.post(message).await {
            Ok(()) => {
                debug!(server = %server, "Gotify notification sent");
                result.record(server, true);
            }
            Err(e) => {
                warn!(
                    server = %server,
                    token = %mask(&self.config.token),
                    error = %e,
                    "Gotify push failed"
                );
                result.record(server, false);
            }
        }

        Ok(result)
    }
}
