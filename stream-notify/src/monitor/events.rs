//! Values flowing through a polling cycle.

use chrono::{DateTime, Local};
use std::fmt;

/// Outcome of probing a room once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    Live,
    Offline,
    /// The probe failed, timed out, or no adapter handles the URL.
    Unknown,
}

impl LiveStatus {
    /// `Some(is_live)` for a confirmed status, `None` when inconclusive.
    pub fn confirmed(self) -> Option<bool> {
        match self {
            Self::Live => Some(true),
            Self::Offline => Some(false),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for LiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Offline => write!(f, "offline"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of one probe of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    pub room_url: String,
    pub status: LiveStatus,
    pub anchor_name: String,
}

impl PollResult {
    pub fn live(room_url: impl Into<String>, anchor_name: impl Into<String>) -> Self {
        Self {
            room_url: room_url.into(),
            status: LiveStatus::Live,
            anchor_name: anchor_name.into(),
        }
    }

    pub fn offline(room_url: impl Into<String>, anchor_name: impl Into<String>) -> Self {
        Self {
            room_url: room_url.into(),
            status: LiveStatus::Offline,
            anchor_name: anchor_name.into(),
        }
    }

    pub fn unknown(room_url: impl Into<String>) -> Self {
        Self {
            room_url: room_url.into(),
            status: LiveStatus::Unknown,
            anchor_name: String::new(),
        }
    }
}

/// Direction of a liveness flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Started,
    Stopped,
}

impl TransitionKind {
    /// Short status text used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Started => "开播啦",
            Self::Stopped => "直播结束",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// A confirmed change of a room's liveness between two confirmed polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub room_url: String,
    pub display_name: String,
    pub kind: TransitionKind,
    pub timestamp: DateTime<Local>,
}
