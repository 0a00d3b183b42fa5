//! ntfy publish via the JSON API.
//!
//! Each configured URL is `<server>/<topic>`. The message is posted to the
//! server root with the topic in the body.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::{ChannelKind, DeliveryResult, NotificationChannel, post_json, split_recipients};
use crate::Result;
use crate::notification::composer::RenderedMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NtfyConfig {
    /// Topic URLs, comma separated.
    pub url: String,
    /// Emoji tags, comma separated.
    pub tags: String,
    /// Also forward the notification to this address.
    pub email: String,
    pub priority: u8,
}

impl Default for NtfyConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            tags: "tada".to_string(),
            email: String::new(),
            priority: 3,
        }
    }
}

impl NtfyConfig {
    pub fn is_complete(&self) -> bool {
        !split_recipients(&self.url).is_empty()
    }
}

/// Splits `https://ntfy.sh/mytopic` into server and topic.
fn split_topic_url(url: &str) -> Option<(&str, &str)> {
    let (server, topic) = url.trim_end_matches('/').rsplit_once('/')?;
    if topic.is_empty() || server.ends_with('/') || !server.contains("://") {
        return None;
    }
    Some((server, topic))
}

pub struct NtfyChannel {
    config: NtfyConfig,
    client: Client,
}

impl NtfyChannel {
    pub fn new(config: NtfyConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn payload(&self, topic: &str, message: &RenderedMessage) -> serde_json::Value {
        let mut tags = split_recipients(&self.config.tags);
        if tags.is_empty() {
            tags.push("partying_face".to_string());
        }
        json!({
            "topic": topic,
            "title": message.title,
            "message": message.content,
            "tags": tags,
            "priority": self.config.priority,
            "actions": [{ "action": "view", "label": "view live", "url": message.room_url }],
            "email": self.config.email.trim(),
        })
    }
}

#[async_trait]
impl NotificationChannel for NtfyChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Ntfy
    }

    fn is_enabled(&self) -> bool {
        self.config.is_complete()
    }

    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryResult> {
        let mut result = DeliveryResult::default();

        for api in split_recipients(&self.config.url) {
            let Some((server, topic)) = split_topic_url(&api) else {
                warn!(url = %api, "ntfy URL must look like <server>/<topic>");
                result.record(api, false);
                continue;
            };

            let payload = self.payload(topic, message);
            let ok = match post_json(&self.client, self.kind(), server, &payload).await {
                Ok(body) if body.get("error").is_none() => true,
                Ok(body) => {
                    warn!(url = %api, error = %body["error"], "ntfy push rejected");
                    false
                }
                Err(e) => {
                    warn!(url = %api, error = %e, "ntfy push failed");
                    false
                }
            };
            result.record(api, ok);
        }

        Ok(result)
    }
}
