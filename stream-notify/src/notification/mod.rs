//! Notification system module.
//!
//! Renders transition events and delivers them through the push channels
//! selected in the configuration (Telegram, WeChat, DingTalk, Bark, ntfy,
//! PushPlus, Feishu, Gotify, Email).
//!
//! # Example
//!
//! ```ignore
//! use stream_notify::config::PushConfig;
//! use stream_notify::notification::NotificationService;
//!
//! let push = PushConfig {
//!     channels: "TG".to_string(),
//!     ..Default::default()
//! };
//! let service = NotificationService::from_config(&push, reqwest::Client::new());
//! let report = service.dispatch(&event).await;
//! ```

pub mod channels;
pub mod composer;
mod service;

pub use channels::{ChannelKind, DeliveryResult, NotificationChannel};
pub use composer::{RenderedMessage, TemplateConfig, render};
pub use service::{
    ChannelOutcome, DispatchReport, NotificationService, NotificationServiceConfig,
    NotificationStats, parse_channel_list,
};
