use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, header};
use serde_json::Value;
use tracing::debug;

use crate::probe::{
    adapter::{PlatformAdapter, RawStatus},
    error::ProbeError,
    utils::capture_group_1,
};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.|m\.)?huya\.com/([A-Za-z0-9_]+)").unwrap()
});

static ROOM_DATA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var TT_ROOM_DATA = (.*?);").unwrap());
static PROFILE_INFO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var TT_PROFILE_INFO = (.*?);").unwrap());
static STREAM_DATA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"stream: (\{.+)\n.*?};").unwrap());

pub struct Huya {
    client: Client,
}

impl Huya {
    const BASE_URL: &'static str = "https://www.huya.com";

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn embedded_json(regex: &Regex, page: &str) -> Option<Value> {
        let raw = regex.captures(page)?.get(1)?.as_str();
        serde_json::from_str(raw).ok()
    }

    fn parse(page: &str) -> Result<RawStatus, ProbeError> {
        if page.contains("找不到这个主播") {
            return Err(ProbeError::StreamerNotFound);
        }
        if page.contains("该主播涉嫌违规，正在整改中") {
            return Err(ProbeError::ApiError("streamer is banned".to_string()));
        }

        let room_data = Self::embedded_json(&ROOM_DATA_REGEX, page).ok_or_else(|| {
            ProbeError::ValidationError("Failed to extract room data".to_string())
        })?;
        let state = room_data
            .get("state")
            .and_then(Value::as_str)
            .ok_or_else(|| ProbeError::ValidationError("State not found".to_string()))?;
        let introduction = room_data
            .get("introduction")
            .and_then(Value::as_str)
            .unwrap_or_default();

        // Replays keep the room "ON" while nobody is broadcasting
        let is_live = state == "ON" && !introduction.contains("【回放】");

        let anchor_name = Self::embedded_json(&PROFILE_INFO_REGEX, page)
            .and_then(|profile| profile["nick"].as_str().map(str::to_string))
            .filter(|nick| !nick.trim().is_empty())
            .or_else(|| {
                Self::embedded_json(&STREAM_DATA_REGEX, page).and_then(|stream| {
                    stream["data"][0]["gameLiveInfo"]["nick"]
                        .as_str()
                        .map(str::to_string)
                })
            })
            .unwrap_or_default();

        Ok(RawStatus::new(is_live, anchor_name))
    }
}

#[async_trait]
impl PlatformAdapter for Huya {
    fn platform_name(&self) -> &'static str {
        "Huya"
    }

    fn cookie_key(&self) -> &'static str {
        "huya"
    }

    fn matches(&self, url: &str) -> bool {
        URL_REGEX.is_match(url)
    }

    async fn probe(&self, url: &str, cookies: Option<&str>) -> Result<RawStatus, ProbeError> {
        let room_id = capture_group_1(&URL_REGEX, url)?;
        debug!("room_id: {}", room_id);

        let mut request = self
            .client
            .get(format!("{}/{}", Self::BASE_URL, room_id))
            .header(header::ORIGIN, Self::BASE_URL)
            .header(header::REFERER, Self::BASE_URL);
        if let Some(cookies) = cookies {
            request = request.header(header::COOKIE, cookies);
        }

        let page = request.send().await?.error_for_status()?.text().await?;
        Self::parse(&page)
    }
}
