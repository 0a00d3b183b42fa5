use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, header};
use serde::Deserialize;
use tracing::debug;

use crate::probe::{
    adapter::{PlatformAdapter, RawStatus},
    error::ProbeError,
    utils::capture_group_1,
};

pub static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:https?://)?live\.douyin\.com/([A-Za-z0-9_.\-]+)").unwrap());

const LIVE_DOUYIN_URL: &str = "https://live.douyin.com";
const WEBCAST_ENTER_URL: &str = "https://live.douyin.com/webcast/room/web/enter/";

/// `status` value of a room that is broadcasting.
const STATUS_LIVE: i32 = 2;

#[derive(Debug, Deserialize)]
struct EnterResponse {
    data: Option<EnterData>,
}

#[derive(Debug, Deserialize)]
struct EnterData {
    prompts: Option<String>,
    #[serde(default)]
    data: Vec<RoomData>,
    user: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
struct RoomData {
    status: i32,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    nickname: String,
}

impl UserInfo {
    fn is_deregistered(&self) -> bool {
        self.nickname == "账号已注销"
    }
}

pub struct Douyin {
    client: Client,
}

impl Douyin {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches anonymous session cookies (`ttwid` and friends) from the live homepage.
    async fn anonymous_cookies(&self) -> Result<String, ProbeError> {
        let response = self.client.get(LIVE_DOUYIN_URL).send().await?;
        let cookies = collect_cookies(
            response
                .headers()
                .get_all(header::SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        if !cookies.contains("ttwid=") {
            return Err(ProbeError::ValidationError(
                "Douyin did not issue a ttwid cookie".to_string(),
            ));
        }
        Ok(cookies)
    }

    fn parse(body: &str) -> Result<RawStatus, ProbeError> {
        if body.trim().is_empty() {
            return Err(ProbeError::ValidationError(
                "Empty response, cookies may be invalid".to_string(),
            ));
        }

        let response: EnterResponse = serde_json::from_str(body)?;
        let data = response
            .data
            .ok_or_else(|| ProbeError::ValidationError("No room data available".to_string()))?;

        if let Some(prompts) = data.prompts.filter(|p| !p.is_empty()) {
            return Err(ProbeError::ApiError(prompts));
        }

        let user = data.user.unwrap_or(UserInfo {
            nickname: String::new(),
        });
        if user.is_deregistered() {
            return Err(ProbeError::StreamerNotFound);
        }

        let room = data
            .data
            .first()
            .ok_or_else(|| ProbeError::ValidationError("No room data available".to_string()))?;

        Ok(RawStatus::new(room.status == STATUS_LIVE, user.nickname))
    }
}

/// Joins the `name=value` part of each `Set-Cookie` header into a `Cookie` value.
fn collect_cookies<'a>(set_cookies: impl Iterator<Item = &'a str>) -> String {
    set_cookies
        .filter_map(|c| c.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl PlatformAdapter for Douyin {
    fn platform_name(&self) -> &'static str {
        "Douyin"
    }

    fn cookie_key(&self) -> &'static str {
        "douyin"
    }

    fn matches(&self, url: &str) -> bool {
        URL_REGEX.is_match(url)
    }

    async fn probe(&self, url: &str, cookies: Option<&str>) -> Result<RawStatus, ProbeError> {
        let web_rid = capture_group_1(&URL_REGEX, url)?;
        debug!("web_rid: {}", web_rid);

        let cookies = match cookies {
            Some(cookies) => cookies.to_string(),
            None => self.anonymous_cookies().await?,
        };

        let body = self
            .client
            .get(WEBCAST_ENTER_URL)
            .query(&[
                ("aid", "6383"),
                ("app_name", "douyin_web"),
                ("live_id", "1"),
                ("device_platform", "web"),
                ("language", "zh-CN"),
                ("browser_language", "zh-CN"),
                ("browser_platform", "Win32"),
                ("browser_name", "Chrome"),
                ("browser_version", "126.0.0.0"),
                ("web_rid", web_rid),
            ])
            .header(header::REFERER, LIVE_DOUYIN_URL)
            .header(header::COOKIE, cookies)
            .send()
            .await?
            .text()
            .await?;

        Self::parse(&body)
    }
}
