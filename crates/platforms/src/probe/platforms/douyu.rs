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
    LazyLock::new(|| Regex::new(r"^(?:https?://)?(?:www\.)?douyu\.com/(\d+)").unwrap());

#[derive(Debug, Deserialize)]
struct BetardResponse {
    room: Option<BetardRoom>,
}

#[derive(Debug, Deserialize)]
struct BetardRoom {
    #[serde(default)]
    owner_name: String,
    show_status: u64,
    #[serde(rename = "videoLoop", default)]
    video_loop: u64,
}

pub struct Douyu {
    client: Client,
}

impl Douyu {
    const BASE_URL: &'static str = "https://www.douyu.com";

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// A room replaying a recording reports `show_status == 1` with `videoLoop == 1`.
    fn parse(body: &str) -> Result<RawStatus, ProbeError> {
        let betard: BetardResponse = serde_json::from_str(body)?;
        let room = betard.room.ok_or(ProbeError::StreamerNotFound)?;
        let is_live = room.show_status == 1 && room.video_loop == 0;
        Ok(RawStatus::new(is_live, room.owner_name))
    }
}

#[async_trait]
impl PlatformAdapter for Douyu {
    fn platform_name(&self) -> &'static str {
        "Douyu"
    }

    fn cookie_key(&self) -> &'static str {
        "douyu"
    }

    fn matches(&self, url: &str) -> bool {
        URL_REGEX.is_match(url)
    }

    async fn probe(&self, url: &str, cookies: Option<&str>) -> Result<RawStatus, ProbeError> {
        let rid = capture_group_1(&URL_REGEX, url)?;
        debug!("rid: {}", rid);

        let mut request = self
            .client
            .get(format!("{}/betard/{rid}", Self::BASE_URL))
            .header(header::REFERER, Self::BASE_URL);
        if let Some(cookies) = cookies {
            request = request.header(header::COOKIE, cookies);
        }

        let body = request.send().await?.text().await?;
        Self::parse(&body)
    }
}
