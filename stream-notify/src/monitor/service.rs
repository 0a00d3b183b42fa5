//! Polling scheduler.
//!
//! Each cycle reloads the room list, probes every room with bounded
//! concurrency, feeds results to the [`LivenessTracker`] and dispatches any
//! transitions. Cycles never overlap: the next one starts only after every
//! room task of the current one has finished and the interval has elapsed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::detector::StreamDetector;
use super::events::{LiveStatus, TransitionKind};
use super::tracker::LivenessTracker;
use crate::Result;
use crate::notification::NotificationService;
use crate::rooms::RoomSource;

/// Shortest allowed pause between cycles.
pub const MIN_INTERVAL: Duration = Duration::from_secs(10);

/// Most probes allowed to run at once.
pub const MAX_CONCURRENT_PROBES: usize = 64;

/// Longest allowed stagger between successive room tasks.
pub const MAX_QUEUE_DELAY: Duration = Duration::from_secs(3600);

/// Raises `requested` to [`MIN_INTERVAL`], logging when it does.
pub fn effective_interval(requested: Duration) -> Duration {
    if requested < MIN_INTERVAL {
        warn!(
            requested_secs = requested.as_secs_f64(),
            min_secs = MIN_INTERVAL.as_secs(),
            "Check interval too short, using the minimum"
        );
        MIN_INTERVAL
    } else {
        requested
    }
}

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct StreamMonitorConfig {
    /// Pause between cycles, never below [`MIN_INTERVAL`].
    pub interval: Duration,
    /// Maximum simultaneous probes, between 1 and [`MAX_CONCURRENT_PROBES`].
    pub max_concurrent_probes: usize,
    /// Stagger between starting successive room tasks.
    pub queue_delay: Duration,
}

impl StreamMonitorConfig {
    pub fn new(interval: Duration, max_concurrent_probes: usize, queue_delay: Duration) -> Self {
        if max_concurrent_probes == 0 {
            warn!("max_concurrent_probes is 0, using 1");
        } else if max_concurrent_probes > MAX_CONCURRENT_PROBES {
            warn!(
                requested = max_concurrent_probes,
                max = MAX_CONCURRENT_PROBES,
                "max_concurrent_probes too large, using the maximum"
            );
        }
        if queue_delay > MAX_QUEUE_DELAY {
            warn!(
                requested_secs = queue_delay.as_secs_f64(),
                max_secs = MAX_QUEUE_DELAY.as_secs(),
                "Queue delay too long, using the maximum"
            );
        }
        Self {
            interval: effective_interval(interval),
            max_concurrent_probes: max_concurrent_probes.clamp(1, MAX_CONCURRENT_PROBES),
            queue_delay: queue_delay.min(MAX_QUEUE_DELAY),
        }
    }
}

impl Default for StreamMonitorConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(300), 3, Duration::ZERO)
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub rooms: usize,
    pub live: usize,
    pub offline: usize,
    pub unknown: usize,
    pub started: usize,
    pub stopped: usize,
    /// Room tasks that panicked or were aborted.
    pub failed_tasks: usize,
    pub cancelled: bool,
}

struct RoomOutcome {
    status: LiveStatus,
    transition: Option<TransitionKind>,
}

/// Stream monitor.
pub struct StreamMonitor {
    config: StreamMonitorConfig,
    rooms: Arc<dyn RoomSource>,
    detector: Arc<StreamDetector>,
    tracker: Arc<LivenessTracker>,
    notifier: Arc<NotificationService>,
}

impl StreamMonitor {
    pub fn new(
        config: StreamMonitorConfig,
        rooms: Arc<dyn RoomSource>,
        detector: Arc<StreamDetector>,
        notifier: Arc<NotificationService>,
    ) -> Self {
        Self {
            config,
            rooms,
            detector,
            tracker: Arc::new(LivenessTracker::new()),
            notifier,
        }
    }

    pub fn tracker(&self) -> &Arc<LivenessTracker> {
        &self.tracker
    }

    pub fn config(&self) -> &StreamMonitorConfig {
        &self.config
    }

    /// Runs cycles until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!(
            interval_secs = self.config.interval.as_secs(),
            max_concurrent_probes = self.config.max_concurrent_probes,
            "Stream monitor started"
        );

        let mut cycle: u64 = 0;
        while !cancel.is_cancelled() {
            cycle += 1;
            let report = self.run_cycle(&cancel).await;
            if report.cancelled {
                break;
            }
            info!(
                cycle,
                rooms = report.rooms,
                live = report.live,
                offline = report.offline,
                unknown = report.unknown,
                started = report.started,
                stopped = report.stopped,
                failed_tasks = report.failed_tasks,
                "Cycle complete"
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!("Stream monitor stopped");
        Ok(())
    }

    /// Runs one cycle. In-flight room tasks are aborted if `cancel` fires.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        let rooms = match self.rooms.load().await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!(error = %e, "Failed to load rooms, skipping cycle");
                return CycleReport::default();
            }
        };

        let purged = self.tracker.retain_rooms(rooms.iter().map(|r| r.url.as_str()));
        if purged > 0 {
            debug!(purged, "Dropped state of rooms no longer registered");
        }

        let mut report = CycleReport {
            rooms: rooms.len(),
            ..Default::default()
        };
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_probes));
        let mut tasks = JoinSet::new();

        for (idx, room) in rooms.into_iter().enumerate() {
            if idx > 0 && !self.config.queue_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.queue_delay) => {}
                }
            }

            let semaphore = semaphore.clone();
            let detector = self.detector.clone();
            let tracker = self.tracker.clone();
            let notifier = self.notifier.clone();

            tasks.spawn(async move {
                let poll = {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return RoomOutcome {
                            status: LiveStatus::Unknown,
                            transition: None,
                        };
                    };
                    detector.check_status(&room.url).await
                };

                let event = tracker.process(&room, &poll);
                if let Some(event) = &event {
                    notifier.dispatch(event).await;
                }

                RoomOutcome {
                    status: poll.status,
                    transition: event.map(|e| e.kind),
                }
            });
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let in_flight = tasks.len();
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    debug!(in_flight, "Cycle cancelled, in-flight probes abandoned");
                    report.cancelled = true;
                    break;
                }
                next = tasks.join_next() => match next {
                    None => break,
                    Some(Ok(outcome)) => {
                        match outcome.status {
                            LiveStatus::Live => report.live += 1,
                            LiveStatus::Offline => report.offline += 1,
                            LiveStatus::Unknown => report.unknown += 1,
                        }
                        match outcome.transition {
                            Some(TransitionKind::Started) => report.started += 1,
                            Some(TransitionKind::Stopped) => report.stopped += 1,
                            None => {}
                        }
                    }
                    Some(Err(e)) => {
                        if e.is_panic() {
                            error!(error = %e, "Room task panicked");
                        } else {
                            debug!(error = %e, "Room task aborted");
                        }
                        report.failed_tasks += 1;
                    }
                }
            }
        }

        report
    }
}
