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
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?twitch\.tv/([^/?#]+)").unwrap());

#[derive(Debug, Deserialize)]
struct GqlResponse {
    data: Option<GqlData>,
}

#[derive(Debug, Deserialize)]
struct GqlData {
    #[serde(rename = "userOrError")]
    user_or_error: Option<UserOrError>,
}

#[derive(Debug, Deserialize)]
struct UserOrError {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    stream: Option<Stream>,
}

#[derive(Debug, Deserialize)]
struct Stream {
    #[serde(rename = "type")]
    stream_type: Option<String>,
}

pub struct Twitch {
    client: Client,
}

impl Twitch {
    const GQL_API_URL: &'static str = "https://gql.twitch.tv/gql";
    const CLIENT_ID: &'static str = "kimne78kx3ncx6brgo4mv6wki5h1ko";

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn channel_shell_query(login: &str) -> serde_json::Value {
        serde_json::json!({
            "operationName": "ChannelShell",
            "extensions": {
                "persistedQuery": {
                    "version": 1,
                    "sha256Hash": "fea4573a7bf2644f5b3f2cbbdcbee0d17312e48d2e55f080589d053aad353f11",
                }
            },
            "variables": { "login": login },
        })
    }

    fn parse(body: &str) -> Result<RawStatus, ProbeError> {
        let response: GqlResponse = serde_json::from_str(body)?;
        let user = response
            .data
            .and_then(|d| d.user_or_error)
            .ok_or_else(|| {
                ProbeError::ValidationError("Could not find user_or_error".to_string())
            })?;

        // Error variants of userOrError carry no display name.
        let display_name = user.display_name.ok_or(ProbeError::StreamerNotFound)?;
        let is_live = user
            .stream
            .map(|s| s.stream_type.as_deref().unwrap_or("live") == "live")
            .unwrap_or(false);

        Ok(RawStatus::new(is_live, display_name))
    }
}

#[async_trait]
impl PlatformAdapter for Twitch {
    fn platform_name(&self) -> &'static str {
        "Twitch"
    }

    fn cookie_key(&self) -> &'static str {
        "twitch"
    }

    fn matches(&self, url: &str) -> bool {
        URL_REGEX.is_match(url)
    }

    async fn probe(&self, url: &str, cookies: Option<&str>) -> Result<RawStatus, ProbeError> {
        let login = capture_group_1(&URL_REGEX, url)?.to_lowercase();
        debug!("login: {}", login);

        let mut request = self
            .client
            .post(Self::GQL_API_URL)
            .header("Client-Id", Self::CLIENT_ID)
            .json(&Self::channel_shell_query(&login));
        if let Some(cookies) = cookies {
            request = request.header(header::COOKIE, cookies);
        }

        let body = request.send().await?.text().await?;
        debug!("body: {}", body);
        Self::parse(&body)
    }
}
