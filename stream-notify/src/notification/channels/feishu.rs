//! Feishu (Lark) custom robot webhooks, sent as `post` rich text.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::{ChannelKind, DeliveryResult, NotificationChannel, post_json, split_recipients};
use crate::Result;
use crate::notification::composer::RenderedMessage;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeishuConfig {
    /// Robot webhook URLs, comma separated.
    pub url: String,
    /// `user_id` or `open_id` to @, `all` for everyone.
    pub at_user: String,
}

impl FeishuConfig {
    pub fn is_complete(&self) -> bool {
        !split_recipients(&self.url).is_empty()
    }

    fn payload(&self, message: &RenderedMessage) -> serde_json::Value {
        let mut line = vec![json!({ "tag": "text", "text": message.content })];
        if !self.at_user.trim().is_empty() {
            line.push(json!({ "tag": "at", "user_id": self.at_user.trim() }));
        }
        json!({
            "msg_type": "post",
            "content": {
                "post": {
                    "zh_cn": {
                        "title": message.title,
                        "content": [line],
                    }
                }
            },
        })
    }
}

pub struct FeishuChannel {
    config: FeishuConfig,
    client: Client,
}

impl FeishuChannel {
    pub fn new(config: FeishuConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl NotificationChannel for FeishuChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Feishu
    }

    fn is_enabled(&self) -> bool {
        self.config.is_complete()
    }

    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryResult> {
        let payload = self.config.payload(message);
        let mut result = DeliveryResult::default();

        for api in split_recipients(&self.config.url) {
            let ok = match post_json(&self.client, self.kind(), &api, &payload).await {
                Ok(body) if body.get("code").and_then(|c| c.as_i64()) == Some(0) => true,
                Ok(body) => {
                    warn!(
                        url = %api,
                        msg = %body.get("msg").unwrap_or(&body),
                        "Feishu push rejected"
                    );
                    false
                }
                Err(e) => {
                    warn!(url = %api, error = %e, "Feishu push failed");
                    false
                }
            };
            result.record(api, ok);
        }

        Ok(result)
    }
}
