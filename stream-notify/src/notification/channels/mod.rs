//! Notification channels.
//!
//! One transport per push vendor:
//! - Telegram Bot API
//! - WeChat via the xizhi relay
//! - DingTalk robot webhooks
//! - Bark, ntfy, PushPlus and Gotify push gateways
//! - Feishu robot webhooks
//! - Email (SMTP)

mod bark;
mod dingtalk;
mod email;
mod feishu;
mod gotify;
mod ntfy;
mod pushplus;
mod telegram;
mod wechat;

pub use bark::{BarkChannel, BarkConfig};
pub use dingtalk::{DingTalkChannel, DingTalkConfig};
pub use email::{EmailChannel, EmailConfig};
pub use feishu::{FeishuChannel, FeishuConfig};
pub use gotify::{GotifyChannel, GotifyConfig};
pub use ntfy::{NtfyChannel, NtfyConfig};
pub use pushplus::{PushPlusChannel, PushPlusConfig};
pub use telegram::{TelegramChannel, TelegramConfig};
pub use wechat::{WeChatChannel, WeChatConfig};

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::composer::RenderedMessage;
use crate::{Error, Result};

/// Canonical channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    WeChat,
    DingTalk,
    Telegram,
    Email,
    Bark,
    Ntfy,
    PushPlus,
    Feishu,
    Gotify,
}

/// Static metadata about a supported channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelKindInfo {
    pub kind: ChannelKind,
    pub label: &'static str,
    /// Accepted spellings, compared after trimming and upper-casing.
    pub aliases: &'static [&'static str],
}

const CHANNEL_KINDS: &[ChannelKindInfo] = &[
    ChannelKindInfo {
        kind: ChannelKind::WeChat,
        label: "WeChat",
        aliases: &["微信", "WECHAT", "WX", "XIZHI"],
    },
    ChannelKindInfo {
        kind: ChannelKind::DingTalk,
        label: "DingTalk",
        aliases: &["钉钉", "DINGTALK", "DD"],
    },
    ChannelKindInfo {
        kind: ChannelKind::Telegram,
        label: "Telegram",
        aliases: &["TG", "TELEGRAM"],
    },
    ChannelKindInfo {
        kind: ChannelKind::Email,
        label: "Email",
        aliases: &["邮箱", "EMAIL", "MAIL", "SMTP"],
    },
    ChannelKindInfo {
        kind: ChannelKind::Bark,
        label: "Bark",
        aliases: &["BARK"],
    },
    ChannelKindInfo {
        kind: ChannelKind::Ntfy,
        label: "ntfy",
        aliases: &["NTFY"],
    },
    ChannelKindInfo {
        kind: ChannelKind::PushPlus,
        label: "PushPlus",
        aliases: &["PUSHPLUS"],
    },
    ChannelKindInfo {
        kind: ChannelKind::Feishu,
        label: "Feishu",
        aliases: &["飞书", "FEISHU", "LARK"],
    },
    ChannelKindInfo {
        kind: ChannelKind::Gotify,
        label: "Gotify",
        aliases: &["GOTIFY"],
    },
];

impl ChannelKind {
    pub fn all() -> impl Iterator<Item = ChannelKind> {
        CHANNEL_KINDS.iter().map(|info| info.kind)
    }

    pub fn info(self) -> &'static ChannelKindInfo {
        CHANNEL_KINDS
            .iter()
            .find(|info| info.kind == self)
            .unwrap_or(&CHANNEL_KINDS[0])
    }

    pub fn label(self) -> &'static str {
        self.info().label
    }

    /// Resolves an operator-entered channel name.
    pub fn from_alias(raw: &str) -> Option<ChannelKind> {
        let needle = raw.trim().to_uppercase();
        if needle.is_empty() {
            return None;
        }
        CHANNEL_KINDS
            .iter()
            .find(|info| info.aliases.iter().any(|a| *a == needle))
            .map(|info| info.kind)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-recipient outcome of one send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub success: Vec<String>,
    pub error: Vec<String>,
}

impl DeliveryResult {
    pub fn record(&mut self, recipient: impl Into<String>, ok: bool) {
        if ok {
            self.success.push(recipient.into());
        } else {
            self.error.push(recipient.into());
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty() && !self.success.is_empty()
    }
}

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Whether every required setting is present.
    fn is_enabled(&self) -> bool;

    /// Sends `message` to every configured recipient.
    ///
    /// Per-recipient failures are reported in the result. `Err` is reserved
    /// for failures that prevent any attempt.
    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryResult>;
}

/// Splits a delimiter-separated recipient list (`,` or `，`).
pub fn split_recipients(raw: &str) -> Vec<String> {
    raw.split([',', '，'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Masks all but the last four characters of a secret for logging.
pub(crate) fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

/// POSTs `body` as JSON and parses the JSON response.
///
/// Non-2xx responses are errors carrying the response text.
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    channel: ChannelKind,
    url: &str,
    body: &T,
) -> Result<serde_json::Value> {
    let response = client.post(url).json(body).send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(Error::channel(
            channel.label(),
            format!("HTTP {status}: {text}"),
        ));
    }
    serde_json::from_str(&text).map_err(|e| {
        Error::channel(channel.label(), format!("Invalid response ({e}): {text}"))
    })
}
