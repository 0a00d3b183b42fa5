use std::{sync::Arc, time::Duration};

use reqwest::Client;

use super::{
    error::ProbeError,
    platforms::{bilibili::Bilibili, douyin::Douyin, douyu::Douyu, huya::Huya, twitch::Twitch},
    registry::AdapterRegistry,
};

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Builds the HTTP client shared by every adapter.
pub fn default_client() -> Result<Client, ProbeError> {
    default_client_with_proxy(None)
}

/// Builds the shared HTTP client, routing all requests through `proxy` when set.
pub fn default_client_with_proxy(proxy: Option<&str>) -> Result<Client, ProbeError> {
    let mut builder = Client::builder()
        .user_agent(DEFAULT_UA)
        .timeout(Duration::from_secs(30));

    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        builder = builder.proxy(reqwest::Proxy::all(proxy.trim())?);
    }

    Ok(builder.build()?)
}

/// Returns an `AdapterRegistry` populated with all the supported platforms.
pub fn default_registry(client: Client) -> AdapterRegistry {
    AdapterRegistry::new()
        .with(Arc::new(Douyin::new(client.clone())))
        .with(Arc::new(Bilibili::new(client.clone())))
        .with(Arc::new(Huya::new(client.clone())))
        .with(Arc::new(Douyu::new(client.clone())))
        .with(Arc::new(Twitch::new(client)))
}
