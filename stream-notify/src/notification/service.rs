//! Notification service implementation.
//!
//! Fans a transition event out to every enabled channel concurrently. Each
//! channel runs in its own task, so an error or panic in one transport is
//! recorded as that channel's outcome and never reaches the others. There is
//! no retry: a failed channel stays failed for that event.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::channels::{
    BarkChannel, ChannelKind, DeliveryResult, DingTalkChannel, EmailChannel, FeishuChannel,
    GotifyChannel, NotificationChannel, NtfyChannel, PushPlusChannel, TelegramChannel,
    WeChatChannel,
};
use super::composer::{RenderedMessage, TemplateConfig, render};
use crate::config::PushConfig;
use crate::monitor::events::{TransitionEvent, TransitionKind};

/// Switches and templates applied to every event.
#[derive(Debug, Clone)]
pub struct NotificationServiceConfig {
    pub push_start: bool,
    pub push_stop: bool,
    pub templates: TemplateConfig,
}

impl Default for NotificationServiceConfig {
    fn default() -> Self {
        Self {
            push_start: true,
            push_stop: true,
            templates: TemplateConfig::default(),
        }
    }
}

/// Outcome of one channel for one event.
#[derive(Debug)]
pub struct ChannelOutcome {
    pub channel: ChannelKind,
    /// Per-recipient results, or why the channel could not deliver at all.
    pub result: std::result::Result<DeliveryResult, String>,
}

impl ChannelOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(delivery) if delivery.is_success())
    }
}

/// Aggregated outcomes of one dispatch.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcome(&self, channel: ChannelKind) -> Option<&ChannelOutcome> {
        self.outcomes.iter().find(|o| o.channel == channel)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Running totals since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationStats {
    pub dispatched_events: u64,
    pub channel_successes: u64,
    pub channel_failures: u64,
}

/// Parses an operator channel list such as `"TG,微信|bark"`.
///
/// Tokens are split on `|`, `,`, `，` and `、`, resolved through the alias
/// table and de-duplicated keeping first-seen order. Unknown tokens are
/// logged and dropped.
pub fn parse_channel_list(raw: &str) -> Vec<ChannelKind> {
    let mut seen = HashSet::new();
    let mut kinds = Vec::new();

    for token in raw.split(['|', ',', '，', '、']).map(str::trim) {
        if token.is_empty() {
            continue;
        }
        match ChannelKind::from_alias(token) {
            Some(kind) => {
                if seen.insert(kind) {
                    kinds.push(kind);
                } else {
                    debug!(alias = token, channel = %kind, "Duplicate channel alias ignored");
                }
            }
            None => warn!(alias = token, "Unknown push channel, ignoring"),
        }
    }

    kinds
}

/// Notification service.
pub struct NotificationService {
    config: NotificationServiceConfig,
    channels: Vec<Arc<dyn NotificationChannel>>,
    dispatched_events: AtomicU64,
    channel_successes: AtomicU64,
    channel_failures: AtomicU64,
}

impl NotificationService {
    /// Creates a service over an explicit channel set.
    pub fn new(
        config: NotificationServiceConfig,
        channels: Vec<Arc<dyn NotificationChannel>>,
    ) -> Self {
        Self {
            config,
            channels,
            dispatched_events: AtomicU64::new(0),
            channel_successes: AtomicU64::new(0),
            channel_failures: AtomicU64::new(0),
        }
    }

    /// Builds the channels selected in `push` whose settings are complete.
    pub fn from_config(push: &PushConfig, client: Client) -> Self {
        let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

        for kind in parse_channel_list(&push.channels) {
            let http = client.clone();
            let channel: Arc<dyn NotificationChannel> = match kind {
                ChannelKind::Telegram => {
                    Arc::new(TelegramChannel::new(push.telegram.clone(), http))
                }
                ChannelKind::WeChat => Arc::new(WeChatChannel::new(push.wechat.clone(), http)),
                ChannelKind::DingTalk => {
                    Arc::new(DingTalkChannel::new(push.dingtalk.clone(), http))
                }
                ChannelKind::Bark => Arc::new(BarkChannel::new(push.bark.clone(), http)),
                ChannelKind::Ntfy => Arc::new(NtfyChannel::new(push.ntfy.clone(), http)),
                ChannelKind::PushPlus => {
                    Arc::new(PushPlusChannel::new(push.pushplus.clone(), http))
                }
                ChannelKind::Feishu => Arc::new(FeishuChannel::new(push.feishu.clone(), http)),
                ChannelKind::Gotify => Arc::new(GotifyChannel::new(push.gotify.clone(), http)),
                ChannelKind::Email => Arc::new(EmailChannel::new(push.email.clone())),
            };

            if channel.is_enabled() {
                channels.push(channel);
            } else {
                warn!(
                    channel = %kind,
                    "Push channel selected but its settings are incomplete, skipping"
                );
            }
        }

        let config = NotificationServiceConfig {
            push_start: push.push_start,
            push_stop: push.push_stop,
            templates: push.templates(),
        };

        info!(
            channels = ?channels.iter().map(|c| c.kind().label()).collect::<Vec<_>>(),
            push_start = config.push_start,
            push_stop = config.push_stop,
            "Notification service configured"
        );

        Self::new(config, channels)
    }

    pub fn channel_kinds(&self) -> Vec<ChannelKind> {
        self.channels.iter().map(|c| c.kind()).collect()
    }

    fn class_enabled(&self, kind: TransitionKind) -> bool {
        match kind {
            TransitionKind::Started => self.config.push_start,
            TransitionKind::Stopped => self.config.push_stop,
        }
    }

    /// Renders `event` and delivers it through every channel concurrently.
    ///
    /// Returns once every channel has finished. Never fails: channel errors
    /// are recorded in the report.
    pub async fn dispatch(&self, event: &TransitionEvent) -> DispatchReport {
        if !self.class_enabled(event.kind) {
            debug!(
                url = %event.room_url,
                kind = %event.kind,
                "Notification class disabled, not dispatching"
            );
            return DispatchReport::default();
        }
        if self.channels.is_empty() {
            debug!(url = %event.room_url, "No push channels enabled");
            return DispatchReport::default();
        }

        let message = Arc::new(render(event, &self.config.templates));
        info!(name = %event.display_name, status = event.kind.label(), "推送消息");

        let report = self.deliver(message).await;

        self.dispatched_events.fetch_add(1, Ordering::Relaxed);
        self.channel_successes
            .fetch_add(report.succeeded() as u64, Ordering::Relaxed);
        self.channel_failures
            .fetch_add(report.failed() as u64, Ordering::Relaxed);

        report
    }

    async fn deliver(&self, message: Arc<RenderedMessage>) -> DispatchReport {
        let (kinds, tasks): (Vec<_>, Vec<_>) = self
            .channels
            .iter()
            .map(|channel| {
                let channel = channel.clone();
                let message = message.clone();
                (
                    channel.kind(),
                    tokio::spawn(async move { channel.send(&message).await }),
                )
            })
            .unzip();

        let outcomes = kinds
            .into_iter()
            .zip(join_all(tasks).await)
            .map(|(channel, joined)| {
                let result = match joined {
                    Ok(Ok(delivery)) => Ok(delivery),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(format!("channel task failed: {e}")),
                };
                match &result {
                    Ok(delivery) if delivery.is_success() => {
                        debug!(
                            channel = %channel,
                            recipients = ?delivery.success,
                            "Notification delivered"
                        );
                    }
                    Ok(delivery) => {
                        warn!(
                            channel = %channel,
                            delivered = ?delivery.success,
                            failed = ?delivery.error,
                            "Notification partially or not delivered"
                        );
                    }
                    Err(e) => warn!(channel = %channel, error = %e, "Notification channel failed"),
                }
                ChannelOutcome { channel, result }
            })
            .collect();

        DispatchReport { outcomes }
    }

    pub fn stats(&self) -> NotificationStats {
        NotificationStats {
            dispatched_events: self.dispatched_events.load(Ordering::Relaxed),
            channel_successes: self.channel_successes.load(Ordering::Relaxed),
            channel_failures: self.channel_failures.load(Ordering::Relaxed),
        }
    }
}
