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
    LazyLock::new(|| Regex::new(r"https?:\/\/(?:www\.)?(?:live\.)?bilibili\.com\/(\d+)").unwrap());

#[derive(Debug, Deserialize)]
struct RoomInfoResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<RoomInfoData>,
}

#[derive(Debug, Deserialize)]
struct RoomInfoData {
    room_info: Option<RoomInfoDetails>,
    anchor_info: Option<AnchorInfo>,
}

#[derive(Debug, Deserialize)]
struct RoomInfoDetails {
    live_status: u32,
}

#[derive(Debug, Deserialize)]
struct AnchorInfo {
    base_info: AnchorBaseInfo,
}

#[derive(Debug, Deserialize)]
struct AnchorBaseInfo {
    #[serde(default)]
    uname: String,
}

pub struct Bilibili {
    client: Client,
}

impl Bilibili {
    const BASE_URL: &'static str = "https://live.bilibili.com";
    const ROOM_INFO_URL: &'static str =
        "https://api.live.bilibili.com/xlive/web-room/v1/index/getInfoByRoom";

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn parse(body: &str) -> Result<RawStatus, ProbeError> {
        let json: RoomInfoResponse = serde_json::from_str(body)?;
        if json.code != 0 {
            return Err(ProbeError::ApiError(json.message));
        }

        let data = json
            .data
            .ok_or_else(|| ProbeError::ValidationError("No room data found".to_string()))?;
        let room_info = data
            .room_info
            .ok_or_else(|| ProbeError::ValidationError("No room info found".to_string()))?;
        let anchor_name = data
            .anchor_info
            .map(|a| a.base_info.uname)
            .unwrap_or_default();

        Ok(RawStatus::new(room_info.live_status == 1, anchor_name))
    }
}

#[async_trait]
impl PlatformAdapter for Bilibili {
    fn platform_name(&self) -> &'static str {
        "Bilibili"
    }

    fn cookie_key(&self) -> &'static str {
        "bilibili"
    }

    fn matches(&self, url: &str) -> bool {
        URL_REGEX.is_match(url)
    }

    async fn probe(&self, url: &str, cookies: Option<&str>) -> Result<RawStatus, ProbeError> {
        let room_id = capture_group_1(&URL_REGEX, url)?;
        debug!("room_id: {}", room_id);

        let mut request = self
            .client
            .get(Self::ROOM_INFO_URL)
            .query(&[("room_id", room_id)])
            .header(header::REFERER, Self::BASE_URL);
        if let Some(cookies) = cookies {
            request = request.header(header::COOKIE, cookies);
        }

        let body = request.send().await?.text().await?;
        Self::parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_live_room() {
        let body = r#"{"code":0,"message":"0","data":{"room_info":{"live_status":1},"anchor_info":{"base_info":{"uname":"Alice"}}}}"#;
        assert_eq!(Bilibili::parse(body).unwrap(), RawStatus::new(true, "Alice"));
    }

    #[test]
    fn round_status_is_not_live() {
        // 2 is "looping replay", which is not a live broadcast.
        let body = r#"{"code":0,"message":"0","data":{"room_info":{"live_status":2},"anchor_info":{"base_info":{"uname":"Bob"}}}}"#;
        assert!(!Bilibili::parse(body).unwrap().is_live);
    }

    #[test]
    fn api_error_is_reported() {
        let body = r#"{"code":19002000,"message":"获取初始化数据失败","data":null}"#;
        assert!(matches!(Bilibili::parse(body), Err(ProbeError::ApiError(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn test_probe() {
        let adapter = Bilibili::new(crate::default_client().unwrap());
        let status = adapter
            .probe("https://live.bilibili.com/21852", None)
            .await
            .unwrap();
        println!("{status:?}");
    }
}
