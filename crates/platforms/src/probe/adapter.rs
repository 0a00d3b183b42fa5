use async_trait::async_trait;

use super::error::ProbeError;

/// Normalized liveness payload returned by a platform adapter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawStatus {
    pub is_live: bool,
    /// Name of the performer as reported by the platform. May be empty.
    pub anchor_name: String,
}

impl RawStatus {
    pub fn new(is_live: bool, anchor_name: impl Into<String>) -> Self {
        Self {
            is_live,
            anchor_name: anchor_name.into(),
        }
    }
}

/// A liveness probe for a single streaming platform.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Human readable platform name, used in logs.
    fn platform_name(&self) -> &'static str;

    /// Key under which the operator stores a cookie for this platform.
    fn cookie_key(&self) -> &'static str;

    /// Whether this adapter handles `url`.
    fn matches(&self, url: &str) -> bool;

    /// Fetches the current liveness of the room at `url`.
    async fn probe(&self, url: &str, cookies: Option<&str>) -> Result<RawStatus, ProbeError>;
}
