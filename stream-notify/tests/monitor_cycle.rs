//! End-to-end polling cycles with scripted platform adapters and in-memory
//! push channels.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use platforms_probe::{AdapterRegistry, PlatformAdapter, ProbeError, RawStatus};
use reqwest::Client;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use stream_notify::config::PushConfig;
use stream_notify::monitor::{StreamDetector, StreamMonitor, StreamMonitorConfig};
use stream_notify::notification::channels::TelegramConfig;
use stream_notify::notification::{
    ChannelKind, DeliveryResult, NotificationChannel, NotificationService,
    NotificationServiceConfig, RenderedMessage,
};
use stream_notify::rooms::{Room, RoomSource, StaticRoomSource};

/// Adapter for `https://fake.live/<id>` whose answer is controlled by the test.
struct FakePlatform {
    live: AtomicBool,
    fail: AtomicBool,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
    started_at: Mutex<Vec<tokio::time::Instant>>,
}

impl FakePlatform {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            live: AtomicBool::new(false),
            fail: AtomicBool::new(false),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            started_at: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PlatformAdapter for FakePlatform {
    fn platform_name(&self) -> &'static str {
        "fake"
    }

    fn cookie_key(&self) -> &'static str {
        "fake"
    }

    fn matches(&self, url: &str) -> bool {
        url.starts_with("https://fake.live/")
    }

    async fn probe(&self, _url: &str, _cookies: Option<&str>) -> Result<RawStatus, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started_at.lock().push(tokio::time::Instant::now());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(ProbeError::ApiError("upstream 500".into()));
        }
        Ok(RawStatus::new(self.live.load(Ordering::SeqCst), "主播A"))
    }
}

/// Channel that records every message it is asked to send.
#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<RenderedMessage>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Ntfy
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, message: &RenderedMessage) -> stream_notify::Result<DeliveryResult> {
        self.sent.lock().push(message.clone());
        let mut result = DeliveryResult::default();
        result.record("topic", true);
        Ok(result)
    }
}

/// Room list that can be edited or made to fail between cycles.
struct EditableRooms {
    rooms: Mutex<Vec<Room>>,
    fail: AtomicBool,
}

impl EditableRooms {
    fn new(rooms: Vec<Room>) -> Arc<Self> {
        Arc::new(Self {
            rooms: Mutex::new(rooms),
            fail: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl RoomSource for EditableRooms {
    async fn load(&self) -> stream_notify::Result<Vec<Room>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(stream_notify::Error::config("rooms file is unreadable"));
        }
        Ok(self.rooms.lock().clone())
    }
}

fn rooms(n: usize) -> Vec<Room> {
    (1..=n)
        .map(|i| Room::new(format!("https://fake.live/{i}")))
        .collect()
}

fn monitor_with(
    platform: Arc<FakePlatform>,
    rooms: Vec<Room>,
    notifier: NotificationService,
    max_concurrent_probes: usize,
) -> StreamMonitor {
    let config =
        StreamMonitorConfig::new(Duration::from_secs(60), max_concurrent_probes, Duration::ZERO);
    monitor_from(platform, Arc::new(StaticRoomSource::new(rooms)), notifier, config)
}

fn monitor_from(
    platform: Arc<FakePlatform>,
    rooms: Arc<dyn RoomSource>,
    notifier: NotificationService,
    config: StreamMonitorConfig,
) -> StreamMonitor {
    let registry = AdapterRegistry::new().with(platform);
    let detector = StreamDetector::new(registry, Duration::from_secs(5));
    StreamMonitor::new(config, rooms, Arc::new(detector), Arc::new(notifier))
}

fn recording_notifier() -> (NotificationService, Arc<RecordingChannel>) {
    let channel = Arc::new(RecordingChannel::default());
    let service = NotificationService::new(
        NotificationServiceConfig::default(),
        vec![channel.clone() as Arc<dyn NotificationChannel>],
    );
    (service, channel)
}

#[tokio::test]
async fn probes_never_exceed_the_concurrency_ceiling() {
    let platform = FakePlatform::new(Duration::from_millis(40));
    let (notifier, _) = recording_notifier();
    let monitor = monitor_with(platform.clone(), rooms(10), notifier, 3);

    let report = monitor.run_cycle(&CancellationToken::new()).await;

    assert_eq!(report.rooms, 10);
    assert_eq!(report.offline, 10);
    assert_eq!(platform.calls.load(Ordering::SeqCst), 10);
    let peak = platform.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency was {peak}");
    assert!(peak >= 2, "probes did not overlap");
}

#[tokio::test]
async fn live_then_offline_sends_start_and_stop() {
    let platform = FakePlatform::new(Duration::ZERO);
    let (notifier, channel) = recording_notifier();
    let monitor = monitor_with(
        platform.clone(),
        vec![Room::with_name("https://fake.live/1", "阿B")],
        notifier,
        3,
    );
    let cancel = CancellationToken::new();

    platform.live.store(true, Ordering::SeqCst);
    let first = monitor.run_cycle(&cancel).await;
    assert_eq!(first.started, 1);

    // Still live: no second notification
    let second = monitor.run_cycle(&cancel).await;
    assert_eq!(second.started, 0);
    assert_eq!(second.live, 1);

    platform.live.store(false, Ordering::SeqCst);
    let third = monitor.run_cycle(&cancel).await;
    assert_eq!(third.stopped, 1);

    let sent = channel.sent.lock();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].content.contains("阿B"));
    assert!(sent[0].content.contains("已开播"));
    assert!(sent[1].content.contains("已结束直播"));
    assert!(sent[1].content.contains("https://fake.live/1"));
}

#[tokio::test]
async fn failed_probe_keeps_state_and_sends_nothing() {
    let platform = FakePlatform::new(Duration::ZERO);
    let (notifier, channel) = recording_notifier();
    let monitor = monitor_with(platform.clone(), rooms(1), notifier, 3);
    let cancel = CancellationToken::new();

    platform.live.store(true, Ordering::SeqCst);
    monitor.run_cycle(&cancel).await;
    assert_eq!(monitor.tracker().is_live("https://fake.live/1"), Some(true));

    platform.fail.store(true, Ordering::SeqCst);
    let report = monitor.run_cycle(&cancel).await;
    assert_eq!(report.unknown, 1);
    assert_eq!(report.stopped, 0);
    assert_eq!(monitor.tracker().is_live("https://fake.live/1"), Some(true));

    // Recovery while still live is not a new start
    platform.fail.store(false, Ordering::SeqCst);
    let report = monitor.run_cycle(&cancel).await;
    assert_eq!(report.started, 0);
    assert_eq!(channel.sent.lock().len(), 1);
}

#[tokio::test]
async fn unsupported_urls_are_reported_unknown() {
    let platform = FakePlatform::new(Duration::ZERO);
    let (notifier, channel) = recording_notifier();
    let monitor = monitor_with(
        platform.clone(),
        vec![Room::new("https://example.com/room/1")],
        notifier,
        3,
    );

    let report = monitor.run_cycle(&CancellationToken::new()).await;

    assert_eq!(report.unknown, 1);
    assert_eq!(platform.calls.load(Ordering::SeqCst), 0);
    assert!(channel.sent.lock().is_empty());
}

#[tokio::test]
async fn cancellation_stops_run_promptly() {
    let platform = FakePlatform::new(Duration::from_secs(30));
    let (notifier, channel) = recording_notifier();
    let monitor = monitor_with(platform.clone(), rooms(4), notifier, 2);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let finished = tokio::time::timeout(Duration::from_secs(5), monitor.run(cancel)).await;
    assert!(matches!(finished, Ok(Ok(()))));
    assert!(channel.sent.lock().is_empty());
}

#[tokio::test]
async fn aliases_of_one_channel_notify_once() {
    let mut server = mockito::Server::new_async().await;
    let telegram = server
        .mock("POST", "/bot42:token/sendMessage")
        .match_body(mockito::Matcher::PartialJson(json!({ "chat_id": "1001" })))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .expect(1)
        .create_async()
        .await;

    let push = PushConfig {
        channels: "TG,Telegram".into(),
        telegram: TelegramConfig {
            token: "42:token".into(),
            chat_id: "1001".into(),
            api_base: server.url(),
        },
        ..Default::default()
    };
    let notifier = NotificationService::from_config(&push, Client::new());
    assert_eq!(notifier.channel_kinds(), vec![ChannelKind::Telegram]);

    let platform = FakePlatform::new(Duration::ZERO);
    platform.live.store(true, Ordering::SeqCst);
    let monitor = monitor_with(platform, rooms(1), notifier, 3);

    let report = monitor.run_cycle(&CancellationToken::new()).await;

    assert_eq!(report.started, 1);
    telegram.assert_async().await;
}

#[tokio::test]
async fn failed_room_load_skips_cycle_and_keeps_state() {
    let platform = FakePlatform::new(Duration::ZERO);
    let source = EditableRooms::new(rooms(1));
    let (notifier, channel) = recording_notifier();
    let monitor = monitor_from(
        platform.clone(),
        source.clone(),
        notifier,
        StreamMonitorConfig::default(),
    );
    let cancel = CancellationToken::new();

    platform.live.store(true, Ordering::SeqCst);
    monitor.run_cycle(&cancel).await;

    source.fail.store(true, Ordering::SeqCst);
    platform.live.store(false, Ordering::SeqCst);
    let skipped = monitor.run_cycle(&cancel).await;
    assert_eq!(skipped.rooms, 0);
    assert_eq!(platform.calls.load(Ordering::SeqCst), 1);
    assert_eq!(monitor.tracker().is_live("https://fake.live/1"), Some(true));

    // The retained state turns the next offline poll into a stop
    source.fail.store(false, Ordering::SeqCst);
    let report = monitor.run_cycle(&cancel).await;
    assert_eq!(report.stopped, 1);
    assert_eq!(channel.sent.lock().len(), 2);
}

#[tokio::test]
async fn removed_room_loses_its_state() {
    let platform = FakePlatform::new(Duration::ZERO);
    let source = EditableRooms::new(rooms(2));
    let (notifier, channel) = recording_notifier();
    let monitor = monitor_from(
        platform.clone(),
        source.clone(),
        notifier,
        StreamMonitorConfig::default(),
    );
    let cancel = CancellationToken::new();

    platform.live.store(true, Ordering::SeqCst);
    let first = monitor.run_cycle(&cancel).await;
    assert_eq!(first.started, 2);

    source.rooms.lock().pop();
    let second = monitor.run_cycle(&cancel).await;
    assert_eq!(second.rooms, 1);
    assert_eq!(second.started, 0);
    assert_eq!(monitor.tracker().len(), 1);
    assert_eq!(monitor.tracker().is_live("https://fake.live/2"), None);

    // Re-added while still live: a fresh start
    source.rooms.lock().push(Room::new("https://fake.live/2"));
    let third = monitor.run_cycle(&cancel).await;
    assert_eq!(third.started, 1);

    let sent = channel.sent.lock();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2].room_url, "https://fake.live/2");
}

#[tokio::test(start_paused = true)]
async fn queue_delay_staggers_room_starts() {
    let platform = FakePlatform::new(Duration::ZERO);
    let (notifier, _) = recording_notifier();
    let config = StreamMonitorConfig::new(Duration::from_secs(60), 3, Duration::from_secs(5));
    let monitor = monitor_from(
        platform.clone(),
        Arc::new(StaticRoomSource::new(rooms(3))),
        notifier,
        config,
    );

    let begin = tokio::time::Instant::now();
    let report = monitor.run_cycle(&CancellationToken::new()).await;
    assert_eq!(report.offline, 3);

    let mut started = platform.started_at.lock().clone();
    started.sort();
    assert_eq!(started.len(), 3);
    for pair in started.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(5));
    }
    assert!(begin.elapsed() >= Duration::from_secs(10));
    assert!(begin.elapsed() < Duration::from_secs(15));
}
