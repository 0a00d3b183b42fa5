//! WeChat notifications through the xizhi relay (`POST {url}` with title/content).

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
pub struct WeChatConfig {
    /// Relay URLs, comma separated.
    pub url: String,
}

impl WeChatConfig {
    pub fn is_complete(&self) -> bool {
        !split_recipients(&self.url).is_empty()
    }
}

pub struct WeChatChannel {
    config: WeChatConfig,
    client: Client,
}

impl WeChatChannel {
    pub fn new(config: WeChatConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl NotificationChannel for WeChatChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WeChat
    }

    fn is_enabled(&self) -> bool {
        self.config.is_complete()
    }

    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryResult> {
        let payload = json!({ "title": message.title, "content": message.content });
        let mut result = DeliveryResult::default();

        for api in split_recipients(&self.config.url) {
            let ok = match post_json(&self.client, self.kind(), &api, &payload).await {
                Ok(body) if body.get("code").and_then(|c| c.as_i64()) == Some(200) => true,
                Ok(body) => {
                    warn!(
                        url = %api,
                        msg = %body.get("msg").unwrap_or(&body),
                        "WeChat push rejected"
                    );
                    false
                }
                Err(e) => {
                    warn!(url = %api, error = %e, "WeChat push failed");
                    false
                }
            };
            result.record(api, ok);
        }

        Ok(result)
    }
}
