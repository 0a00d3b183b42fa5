//! PushPlus (`POST https://www.pushplus.plus/send`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::{ChannelKind, DeliveryResult, NotificationChannel, mask, post_json, split_recipients};
use crate::Result;
use crate::notification::composer::RenderedMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushPlusConfig {
    /// User tokens, comma separated.
    pub token: String,
    pub api_url: String,
}

impl Default for PushPlusConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: "https://www.pushplus.plus/send".to_string(),
        }
    }
}

impl PushPlusConfig {
    pub fn is_complete(&self) -> bool {
        !split_recipients(&self.token).is_empty()
    }
}

pub struct PushPlusChannel {
    config: PushPlusConfig,
    client: Client,
}

impl PushPlusChannel {
    pub fn new(config: PushPlusConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl NotificationChannel for PushPlusChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::PushPlus
    }

    fn is_enabled(&self) -> bool {
        self.config.is_complete()
    }

    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryResult> {
        let mut result = DeliveryResult::default();

        for token in split_recipients(&self.config.token) {
            let payload = json!({
                "token": token,
                "title": message.title,
                "content": message.content,
            });
            let sent = post_json(&self.client, self.kind(), &self.config.api_url, &payload).await;
            let ok = match sent {
                Ok(body) if body.get("code").and_then(|c| c.as_i64()) == Some(200) => true,
                Ok(body) => {
                    warn!(
                        token = %mask(&token),
                        msg = %body.get("msg").unwrap_or(&body),
                        "PushPlus push rejected"
                    );
                    false
                }
                Err(e) => {
                    warn!(token = %mask(&token), error = %e, "PushPlus push failed");
                    false
                }
            };
            result.record(mask(&token), ok);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn each_token_is_attempted() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("POST", "/send")
            .match_body(mockito::Matcher::PartialJson(json!({ "token": "good-token" })))
            .with_body(r#"{"code":200,"msg":"请求成功"}"#)
            .create_async()
            .await;
        let _bad = server
            .mock("POST", "/send")
            .match_body(mockito::Matcher::PartialJson(json!({ "token": "bad-token" })))
            .with_body(r#"{"code":903,"msg":"无效的用户token"}"#)
            .create_async()
            .await;

        let channel = PushPlusChannel::new(
            PushPlusConfig {
                token: "good-token,bad-token".into(),
                api_url: format!("{}/send", server.url()),
            },
            Client::new(),
        );
        let msg = RenderedMessage {
            title: "T".into(),
            content: "C".into(),
            room_url: "u".into(),
        };
        let result = channel.send(&msg).await.unwrap();

        assert_eq!(result.success, vec!["****oken".to_string()]);
        assert_eq!(result.error.len(), 1);
    }
}
