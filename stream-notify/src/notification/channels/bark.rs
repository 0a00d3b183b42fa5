//! Bark iOS push gateway.

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
pub struct BarkConfig {
    /// Device push URLs (`https://api.day.app/<key>`), comma separated.
    pub url: String,
    /// Interruption level: `active`, `timeSensitive`, `passive` or `critical`.
    pub level: String,
    /// Notification sound name, empty for the default.
    pub sound: String,
}

impl Default for BarkConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            level: "active".to_string(),
            sound: String::new(),
        }
    }
}

impl BarkConfig {
    pub fn is_complete(&self) -> bool {
        !split_recipients(&self.url).is_empty()
    }
}

pub struct BarkChannel {
    config: BarkConfig,
    client: Client,
}

impl BarkChannel {
    pub fn new(config: BarkConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl NotificationChannel for BarkChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Bark
    }

    fn is_enabled(&self) -> bool {
        self.config.is_complete()
    }

    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryResult> {
        let payload = json!({
            "title": message.title,
            "body": message.content,
            "level": self.config.level,
            "badge": 1,
            "autoCopy": 1,
            "sound": self.config.sound,
            "isArchive": 1,
            "url": message.room_url,
        });
        let mut result = DeliveryResult::default();

        for api in split_recipients(&self.config.url) {
            let ok = match post_json(&self.client, self.kind(), &api, &payload).await {
                Ok(body) if body.get("code").and_then(|c| c.as_i64()) == Some(200) => true,
                Ok(body) => {
                    warn!(
                        url = %api,
                        reason = %body.get("message").unwrap_or(&body),
                        "Bark push rejected"
                    );
                    false
                }
                Err(e) => {
                    warn!(url = %api, error = %e, "Bark push failed");
                    false
                }
            };
            result.record(api, ok);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_level_and_room_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/key")
            .match_body(mockito::Matcher::PartialJson(json!({
                "level": "timeSensitive",
                "url": "https://www.douyu.com/1",
            })))
            .with_body(r#"{"code":200,"message":"success"}"#)
            .create_async()
            .await;

        let channel = BarkChannel::new(
            BarkConfig {
                url: format!("{}/key", server.url()),
                level: "timeSensitive".into(),
                ..Default::default()
            },
            Client::new(),
        );
        let msg = RenderedMessage {
            title: "T".into(),
            content: "C".into(),
            room_url: "https://www.douyu.com/1".into(),
        };
        let result = channel.send(&msg).await.unwrap();

        mock.assert_async().await;
        assert!(result.is_success());
    }
}
