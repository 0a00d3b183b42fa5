//! Stream monitor module for detecting live status changes.
//!
//! - [`StreamDetector`] probes one room through the platform adapters.
//! - [`LivenessTracker`] turns confirmed polls into transition events.
//! - [`StreamMonitor`] drives the polling cycles.

mod detector;
pub mod events;
mod service;
mod tracker;

pub use detector::StreamDetector;
pub use events::{LiveStatus, PollResult, TransitionEvent, TransitionKind};
pub use service::{
    CycleReport, MAX_CONCURRENT_PROBES, MAX_QUEUE_DELAY, MIN_INTERVAL, StreamMonitor,
    StreamMonitorConfig, effective_interval,
};
pub use tracker::{LivenessState, LivenessTracker, resolve_display_name};
