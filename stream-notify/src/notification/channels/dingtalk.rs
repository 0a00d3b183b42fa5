//! DingTalk custom robot webhooks (`msgtype: text`).

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
pub struct DingTalkConfig {
    /// Robot webhook URLs, comma separated.
    pub url: String,
    /// Mobile number to @ in the group.
    pub at_mobile: String,
    /// @ everyone in the group.
    pub at_all: bool,
}

impl DingTalkConfig {
    pub fn is_complete(&self) -> bool {
        !split_recipients(&self.url).is_empty()
    }

    fn payload(&self, content: &str) -> serde_json::Value {
        let mobiles: Vec<&str> = Some(self.at_mobile.trim())
            .filter(|m| !m.is_empty())
            .into_iter()
            .collect();
        json!({
            "msgtype": "text",
            "text": { "content": content },
            "at": { "atMobiles": mobiles, "isAtAll": self.at_all },
        })
    }
}

pub struct DingTalkChannel {
    config: DingTalkConfig,
    client: Client,
}

impl DingTalkChannel {
    pub fn new(config: DingTalkConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl NotificationChannel for DingTalkChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::DingTalk
    }

    fn is_enabled(&self) -> bool {
        self.config.is_complete()
    }

    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryResult> {
        let payload = self.config.payload(&message.content);
        let mut result = DeliveryResult::default();

        for api in split_recipients(&self.config.url) {
            let ok = match post_json(&self.client, self.kind(), &api, &payload).await {
                Ok(body) if body.get("errcode").and_then(|c| c.as_i64()) == Some(0) => true,
                Ok(body) => {
                    warn!(
                        url = %api,
                        errmsg = %body.get("errmsg").unwrap_or(&body),
                        "DingTalk push rejected"
                    );
                    false
                }
                Err(e) => {
                    warn!(url = %api, error = %e, "DingTalk push failed");
                    false
                }
            };
            result.record(api, ok);
        }

        Ok(result)
    }
}
