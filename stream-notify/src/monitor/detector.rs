//! Individual stream detection.
//!
//! Turns every adapter outcome into a [`PollResult`]. Adapter errors,
//! timeouts and unsupported URLs all become [`LiveStatus::Unknown`].

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use parking_lot::Mutex;
use platforms_probe::{AdapterRegistry, ProbeError};
use tracing::{debug, warn};

use super::events::{LiveStatus, PollResult};

/// Stream detector wrapping the adapter registry.
pub struct StreamDetector {
    registry: AdapterRegistry,
    /// Cookie per platform, keyed by [`platforms_probe::PlatformAdapter::cookie_key`].
    cookies: HashMap<String, String>,
    probe_timeout: Duration,
    /// URLs already reported as unsupported; later cycles log them at debug.
    unsupported: Mutex<HashSet<String>>,
}

impl StreamDetector {
    pub fn new(registry: AdapterRegistry, probe_timeout: Duration) -> Self {
        Self {
            registry,
            cookies: HashMap::new(),
            probe_timeout,
            unsupported: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_cookies(mut self, cookies: HashMap<String, String>) -> Self {
        self.cookies = cookies
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        self
    }

    /// Probes `url` once.
    pub async fn check_status(&self, url: &str) -> PollResult {
        let Some(adapter) = self.registry.find(url) else {
            if self.first_unsupported_report(url) {
                warn!("Unsupported platform for URL: {}", url);
            } else {
                debug!("Unsupported platform for URL: {}", url);
            }
            return PollResult::unknown(url);
        };

        let cookies = self.cookies.get(adapter.cookie_key()).map(String::as_str);
        debug!(
            platform = adapter.platform_name(),
            has_cookie = cookies.is_some(),
            "Checking status for {}",
            url
        );

        let outcome = tokio::time::timeout(self.probe_timeout, adapter.probe(url, cookies)).await;
        match outcome {
            Ok(Ok(raw)) => PollResult {
                room_url: url.to_string(),
                status: if raw.is_live {
                    LiveStatus::Live
                } else {
                    LiveStatus::Offline
                },
                anchor_name: raw.anchor_name,
            },
            Ok(Err(ProbeError::StreamerNotFound)) => {
                warn!(platform = adapter.platform_name(), "Streamer not found: {}", url);
                PollResult::unknown(url)
            }
            Ok(Err(e)) => {
                debug!(platform = adapter.platform_name(), error = %e, "Probe failed for {}", url);
                PollResult::unknown(url)
            }
            Err(_) => {
                debug!(
                    platform = adapter.platform_name(),
                    timeout_secs = self.probe_timeout.as_secs_f64(),
                    "Probe timed out for {}",
                    url
                );
                PollResult::unknown(url)
            }
        }
    }

    fn first_unsupported_report(&self, url: &str) -> bool {
        self.unsupported.lock().insert(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use platforms_probe::{PlatformAdapter, RawStatus};
    use std::sync::{Arc, Mutex};

    struct Scripted {
        result: fn() -> Result<RawStatus, ProbeError>,
        delay: Duration,
        seen_cookie: Mutex<Option<String>>,
    }

    #[async_trait]
    impl PlatformAdapter for Scripted {
        fn platform_name(&self) -> &'static str {
            "Scripted"
        }

        fn cookie_key(&self) -> &'static str {
            "scripted"
        }

        fn matches(&self, url: &str) -> bool {
            url.starts_with("https://scripted.test/")
        }

        async fn probe(&self, _url: &str, cookies: Option<&str>) -> Result<RawStatus, ProbeError> {
            *self.seen_cookie.lock().unwrap() = cookies.map(str::to_string);
            tokio::time::sleep(self.delay).await;
            (self.result)()
        }
    }

    fn detector(adapter: Arc<Scripted>, timeout: Duration) -> StreamDetector {
        StreamDetector::new(AdapterRegistry::new().with(adapter), timeout)
    }

    fn scripted(result: fn() -> Result<RawStatus, ProbeError>, delay: Duration) -> Arc<Scripted> {
        Arc::new(Scripted {
            result,
            delay,
            seen_cookie: Mutex::new(None),
        })
    }

    #[tokio::test]
    async fn live_result_is_mapped() {
        let adapter = scripted(|| Ok(RawStatus::new(true, "Alice")), Duration::ZERO);
        let result = detector(adapter, Duration::from_secs(1))
            .check_status("https://scripted.test/1")
            .await;
        assert_eq!(result, PollResult::live("https://scripted.test/1", "Alice"));
    }

    #[tokio::test]
    async fn errors_become_unknown() {
        let adapter = scripted(|| Err(ProbeError::ApiError("boom".into())), Duration::ZERO);
        let result = detector(adapter, Duration::from_secs(1))
            .check_status("https://scripted.test/1")
            .await;
        assert_eq!(result.status, LiveStatus::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_becomes_unknown() {
        let adapter = scripted(|| Ok(RawStatus::new(true, "A")), Duration::from_secs(60));
        let result = detector(adapter, Duration::from_secs(5))
            .check_status("https://scripted.test/1")
            .await;
        assert_eq!(result.status, LiveStatus::Unknown);
    }

    #[tokio::test]
    async fn unsupported_url_is_unknown() {
        let adapter = scripted(|| Ok(RawStatus::new(true, "A")), Duration::ZERO);
        let result = detector(adapter, Duration::from_secs(1))
            .check_status("https://elsewhere.test/1")
            .await;
        assert_eq!(result.status, LiveStatus::Unknown);
    }

    #[tokio::test]
    async fn unsupported_url_is_warned_once() {
        let adapter = scripted(|| Ok(RawStatus::new(true, "A")), Duration::ZERO);
        let detector = detector(adapter, Duration::from_secs(1));

        detector.check_status("https://elsewhere.test/1").await;
        assert!(!detector.first_unsupported_report("https://elsewhere.test/1"));

        let result = detector.check_status("https://elsewhere.test/1").await;
        assert_eq!(result.status, LiveStatus::Unknown);
        assert!(detector.first_unsupported_report("https://elsewhere.test/2"));
    }

    #[tokio::test]
    async fn platform_cookie_is_passed() {
        let adapter = scripted(|| Ok(RawStatus::new(false, "A")), Duration::ZERO);
        let detector = detector(adapter.clone(), Duration::from_secs(1)).with_cookies(
            [("Scripted".to_string(), "sid=1".to_string())].into_iter().collect(),
        );
        detector.check_status("https://scripted.test/1").await;
        assert_eq!(adapter.seen_cookie.lock().unwrap().as_deref(), Some("sid=1"));
    }
}
