//! Renders transition events into notification text.
//!
//! Templates use fixed bracketed markers replaced literally:
//! `[直播间名称]` (room name), `[时间]` (time), `[链接]` / `[URL]` (room URL).

use serde::{Deserialize, Serialize};

use crate::monitor::events::{TransitionEvent, TransitionKind};

pub const NAME_MARKER: &str = "[直播间名称]";
pub const TIME_MARKER: &str = "[时间]";
pub const URL_MARKERS: [&str; 2] = ["[链接]", "[URL]"];

/// Timestamp format substituted for [`TIME_MARKER`].
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_TITLE: &str = "直播间通知";
pub const DEFAULT_START_TEMPLATE: &str = r"[直播间名称] 已开播！ \n [时间]";
pub const DEFAULT_STOP_TEMPLATE: &str = r"[直播间名称] 已结束直播。 \n [时间]";

/// Notification title and body templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub title: String,
    pub start_template: String,
    pub stop_template: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            start_template: DEFAULT_START_TEMPLATE.to_string(),
            stop_template: DEFAULT_STOP_TEMPLATE.to_string(),
        }
    }
}

/// A message ready to hand to channel transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub content: String,
    /// Room the message is about, used by transports that support click-through links.
    pub room_url: String,
}

/// Renders `event` with `templates`.
///
/// The body always contains the room URL, it is appended when the template
/// does not produce it.
pub fn render(event: &TransitionEvent, templates: &TemplateConfig) -> RenderedMessage {
    let now = event.timestamp.format(TIME_FORMAT).to_string();
    let url = event.room_url.as_str();

    let template = match event.kind {
        TransitionKind::Started => &templates.start_template,
        TransitionKind::Stopped => &templates.stop_template,
    };

    let content = if template.trim().is_empty() {
        format!("主播：{}\n时间：{now}\n链接：{url}", event.display_name)
    } else {
        let mut content = template
            .replace(NAME_MARKER, &event.display_name)
            .replace(TIME_MARKER, &now);
        for marker in URL_MARKERS {
            content = content.replace(marker, url);
        }
        content = content.replace("\\n", "\n");
        if !content.contains(url) {
            content.push_str("\n链接：");
            content.push_str(url);
        }
        content
    };

    let title = if templates.title.trim().is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        templates.title.clone()
    };

    RenderedMessage {
        title,
        content,
        room_url: event.room_url.clone(),
    }
}
