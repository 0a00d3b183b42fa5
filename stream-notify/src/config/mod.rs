//! Application configuration.
//!
//! Loaded once at startup from a TOML file:
//!
//! ```toml
//! [global]
//! interval_secs = 300
//! max_concurrent_probes = 3
//!
//! [push]
//! channels = "TG,钉钉"
//!
//! [push.telegram]
//! token = "123:abc"
//! chat_id = "42"
//!
//! [cookies]
//! bilibili = "SESSDATA=..."
//! ```

pub mod backup;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::monitor::{MAX_CONCURRENT_PROBES, MAX_QUEUE_DELAY};
use crate::notification::channels::{
    BarkConfig, DingTalkConfig, EmailConfig, FeishuConfig, GotifyConfig, NtfyConfig,
    PushPlusConfig, TelegramConfig, WeChatConfig,
};
use crate::notification::composer::{
    DEFAULT_START_TEMPLATE, DEFAULT_STOP_TEMPLATE, DEFAULT_TITLE, TemplateConfig,
};
use crate::{Error, Result};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub global: GlobalConfig,
    pub push: PushConfig,
    /// Cookie per platform key (`bilibili`, `douyu`, `twitch`).
    pub cookies: HashMap<String, String>,
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Seconds between cycles. Values below the scheduler floor are raised to it.
    pub interval_secs: u64,
    /// Maximum number of simultaneous platform probes.
    pub max_concurrent_probes: usize,
    /// Per-probe timeout in seconds.
    pub probe_timeout_secs: u64,
    /// Delay between starting successive room probes within a cycle.
    pub queue_delay_secs: f64,
    /// HTTP proxy used for platform probes.
    pub proxy: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            max_concurrent_probes: 3,
            probe_timeout_secs: 30,
            queue_delay_secs: 0.0,
            proxy: None,
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Selected channels, e.g. `"TG|微信"`.
    pub channels: String,
    pub title: String,
    pub start_template: String,
    pub stop_template: String,
    /// Notify when a room goes live.
    pub push_start: bool,
    /// Notify when a room goes offline.
    pub push_stop: bool,
    /// Overrides `global.interval_secs` when set.
    pub check_interval_secs: Option<u64>,

    pub telegram: TelegramConfig,
    pub wechat: WeChatConfig,
    pub dingtalk: DingTalkConfig,
    pub bark: BarkConfig,
    pub ntfy: NtfyConfig,
    pub pushplus: PushPlusConfig,
    pub feishu: FeishuConfig,
    pub gotify: GotifyConfig,
    pub email: EmailConfig,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            channels: String::new(),
            title: DEFAULT_TITLE.to_string(),
            start_template: DEFAULT_START_TEMPLATE.to_string(),
            stop_template: DEFAULT_STOP_TEMPLATE.to_string(),
            push_start: true,
            push_stop: true,
            check_interval_secs: None,
            telegram: TelegramConfig::default(),
            wechat: WeChatConfig::default(),
            dingtalk: DingTalkConfig::default(),
            bark: BarkConfig::default(),
            ntfy: NtfyConfig::default(),
            pushplus: PushPlusConfig::default(),
            feishu: FeishuConfig::default(),
            gotify: GotifyConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl PushConfig {
    pub fn templates(&self) -> TemplateConfig {
        TemplateConfig {
            title: self.title.clone(),
            start_template: self.start_template.clone(),
            stop_template: self.stop_template.clone(),
        }
    }
}

impl AppConfig {
    /// Reads and parses `path`. A missing or malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::parse(&raw)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.global.probe_timeout_secs == 0 {
            return Err(Error::config("global.probe_timeout_secs must be greater than 0"));
        }
        if self.global.max_concurrent_probes > MAX_CONCURRENT_PROBES {
            return Err(Error::config(format!(
                "global.max_concurrent_probes must be at most {MAX_CONCURRENT_PROBES}"
            )));
        }
        let queue_delay = self.global.queue_delay_secs;
        if !queue_delay.is_finite() || queue_delay < 0.0 {
            return Err(Error::config(
                "global.queue_delay_secs must be a non-negative number",
            ));
        }
        if queue_delay > MAX_QUEUE_DELAY.as_secs_f64() {
            return Err(Error::config(format!(
                "global.queue_delay_secs must be at most {}",
                MAX_QUEUE_DELAY.as_secs()
            )));
        }
        if let Some(proxy) = self.global.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let parsed = url::Url::parse(proxy.trim())
                .map_err(|e| Error::config(format!("global.proxy is not a valid URL: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https" | "socks5" | "socks5h") {
                return Err(Error::config(format!(
                    "global.proxy has unsupported scheme '{}'",
                    parsed.scheme()
                )));
            }
        }
        Ok(())
    }

    /// Configured cycle interval before the scheduler floor is applied.
    pub fn interval_secs(&self) -> u64 {
        self.push
            .check_interval_secs
            .unwrap_or(self.global.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.global.interval_secs, 300);
        assert_eq!(config.global.max_concurrent_probes, 3);
        assert!(config.push.push_start);
        assert!(config.push.push_stop);
        assert_eq!(config.push.title, "直播间通知");
        assert_eq!(config.push.bark.level, "active");
        assert_eq!(config.push.gotify.priority, 5);
        assert_eq!(config.push.email.port, 465);
    }

    #[test]
    fn parses_sections() {
        let raw = r#"
            [global]
            interval_secs = 60
            max_concurrent_probes = 5
            proxy = "http://127.0.0.1:7890"

            [push]
            channels = "TG|钉钉"
            push_stop = false
            start_template = "[直播间名称] live"

            [push.telegram]
            token = "123:abc"
            chat_id = "42"

            [push.dingtalk]
            url = "https://oapi.dingtalk.com/robot/send?access_token=x"
            at_all = true

            [cookies]
            bilibili = "SESSDATA=1"
        "#;
        let config = AppConfig::parse(raw).unwrap();
        assert_eq!(config.interval_secs(), 60);
        assert_eq!(config.global.max_concurrent_probes, 5);
        assert_eq!(config.global.proxy.as_deref(), Some("http://127.0.0.1:7890"));
        assert!(!config.push.push_stop);
        assert_eq!(config.push.templates().start_template, "[直播间名称] live");
        assert!(config.push.telegram.is_complete());
        assert!(config.push.dingtalk.at_all);
        assert_eq!(config.cookies["bilibili"], "SESSDATA=1");
    }

    #[test]
    fn push_interval_overrides_global() {
        let config = AppConfig::parse("[push]\ncheck_interval_secs = 30\n").unwrap();
        assert_eq!(config.interval_secs(), 30);
    }

    #[test]
    fn malformed_file_is_rejected() {
        assert!(AppConfig::parse("[global\ninterval_secs = ").is_err());
        assert!(AppConfig::parse("[global]\nprobe_timeout_secs = 0").is_err());
    }

    #[test]
    fn out_of_range_scheduler_settings_are_rejected() {
        assert!(AppConfig::parse("[global]\nqueue_delay_secs = 1e30").is_err());
        assert!(AppConfig::parse("[global]\nqueue_delay_secs = -1.0").is_err());
        assert!(AppConfig::parse("[global]\nmax_concurrent_probes = 9000000000000000000").is_err());

        let ok = AppConfig::parse("[global]\nqueue_delay_secs = 1.5\nmax_concurrent_probes = 64")
            .unwrap();
        assert_eq!(ok.global.max_concurrent_probes, 64);
    }

    #[test]
    fn proxy_must_be_a_url() {
        assert!(AppConfig::parse("[global]\nproxy = \"not a url\"").is_err());
        assert!(AppConfig::parse("[global]\nproxy = \"ftp://127.0.0.1:21\"").is_err());
        let ok = AppConfig::parse("[global]\nproxy = \"http://127.0.0.1:7890\"").unwrap();
        assert_eq!(ok.global.proxy.as_deref(), Some("http://127.0.0.1:7890"));
        assert!(AppConfig::parse("[global]\nproxy = \"\"").is_ok());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = AppConfig::load("/nonexistent/config.toml").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
