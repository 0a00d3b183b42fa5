//! Per-room liveness state machine.

use std::collections::{HashMap, HashSet};

use chrono::Local;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::events::{PollResult, TransitionEvent, TransitionKind};
use crate::rooms::{Room, UNKNOWN_PERFORMER};

/// Last confirmed liveness of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessState {
    pub room_url: String,
    pub is_live: bool,
    pub last_anchor_name: String,
}

/// Tracks confirmed liveness per room and emits an event on every flip.
///
/// Rooms that were never confirmed are treated as offline, so the first
/// confirmed live poll of a room emits [`TransitionKind::Started`].
#[derive(Debug, Default)]
pub struct LivenessTracker {
    states: Mutex<HashMap<String, LivenessState>>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one poll result for `room`.
    ///
    /// Inconclusive polls leave the state untouched. The prior state is read
    /// and the new one written under the same lock.
    pub fn process(&self, room: &Room, poll: &PollResult) -> Option<TransitionEvent> {
        let Some(is_live) = poll.status.confirmed() else {
            debug!(url = %room.url, "Inconclusive poll, state unchanged");
            return None;
        };

        let mut states = self.states.lock();
        let state = states
            .entry(room.url.clone())
            .or_insert_with(|| LivenessState {
                room_url: room.url.clone(),
                is_live: false,
                last_anchor_name: String::new(),
            });

        if !poll.anchor_name.trim().is_empty() {
            state.last_anchor_name = poll.anchor_name.trim().to_string();
        }

        let kind = match (state.is_live, is_live) {
            (false, true) => TransitionKind::Started,
            (true, false) => TransitionKind::Stopped,
            _ => return None,
        };
        state.is_live = is_live;

        let display_name = resolve_display_name(room, &state.last_anchor_name);
        drop(states);

        info!(url = %room.url, name = %display_name, status = kind.label(), "Live status changed");
        Some(TransitionEvent {
            room_url: room.url.clone(),
            display_name,
            kind,
            timestamp: Local::now(),
        })
    }

    /// Drops state for rooms not in `urls`. Returns the number removed.
    pub fn retain_rooms<'a>(&self, urls: impl IntoIterator<Item = &'a str>) -> usize {
        let keep: HashSet<&str> = urls.into_iter().collect();
        let mut states = self.states.lock();
        let before = states.len();
        states.retain(|url, _| keep.contains(url.as_str()));
        before - states.len()
    }

    /// Last confirmed liveness of `url`, if it was ever confirmed.
    pub fn is_live(&self, url: &str) -> Option<bool> {
        self.states.lock().get(url).map(|s| s.is_live)
    }

    pub fn snapshot(&self) -> Vec<LivenessState> {
        self.states.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }
}

/// Whether an operator-supplied name should be replaced by the platform's.
fn is_placeholder_name(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name == UNKNOWN_PERFORMER || name.eq_ignore_ascii_case("unknown")
}

/// Operator name first, then the platform anchor name, then the URL.
pub fn resolve_display_name(room: &Room, anchor_name: &str) -> String {
    if let Some(name) = room.display_name.as_deref().filter(|n| !is_placeholder_name(n)) {
        return name.trim().to_string();
    }
    if !anchor_name.trim().is_empty() {
        return anchor_name.trim().to_string();
    }
    room.url.clone()
}
