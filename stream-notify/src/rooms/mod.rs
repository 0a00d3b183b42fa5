//! Room registry.
//!
//! Rooms are read from a line-oriented file on every cycle so edits take
//! effect without a restart. Accepted line shapes:
//!
//! ```text
//! # comment
//! 1,https://live.bilibili.com/21852,Some Name
//! https://www.douyu.com/9999
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::Result;

/// Placeholder name written by operators who do not know the performer.
pub const UNKNOWN_PERFORMER: &str = "未知主播";

/// A monitored live room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub url: String,
    pub display_name: Option<String>,
}

impl Room {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_name: None,
        }
    }

    pub fn with_name(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_name: Some(name.into()),
        }
    }
}

/// Source of the room list, consulted once per cycle.
#[async_trait]
pub trait RoomSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Room>>;
}

/// Reads rooms from a text file.
#[derive(Debug, Clone)]
pub struct FileRoomSource {
    path: PathBuf,
}

impl FileRoomSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RoomSource for FileRoomSource {
    async fn load(&self) -> Result<Vec<Room>> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(parse_rooms(&text))
    }
}

/// Fixed in-memory room list.
#[derive(Debug, Clone, Default)]
pub struct StaticRoomSource {
    rooms: Vec<Room>,
}

impl StaticRoomSource {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self { rooms }
    }
}

#[async_trait]
impl RoomSource for StaticRoomSource {
    async fn load(&self) -> Result<Vec<Room>> {
        Ok(self.rooms.clone())
    }
}

/// Parses the rooms file format.
///
/// Unrecognized lines are logged and skipped. A repeated URL keeps its first
/// entry and the duplicate is logged.
pub fn parse_rooms(text: &str) -> Vec<Room> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut seen = HashSet::new();
    let mut rooms = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(room) = parse_line(line) else {
            warn!(line = line_no, content = %line, "Unrecognized room line, skipping");
            continue;
        };

        if !seen.insert(room.url.clone()) {
            warn!(line = line_no, url = %room.url, "Duplicate room URL, keeping first entry");
            continue;
        }

        debug!(url = %room.url, name = ?room.display_name, "Loaded room");
        rooms.push(room);
    }

    rooms
}

fn parse_line(line: &str) -> Option<Room> {
    if line.matches(',').count() >= 2 {
        let mut parts = line.splitn(3, ',');
        let _index = parts.next()?;
        let url = parts.next()?.trim();
        let name = parts.next()?.trim();
        if url.is_empty() {
            return None;
        }
        let display_name = (!name.is_empty()).then(|| name.to_string());
        return Some(Room {
            url: url.to_string(),
            display_name,
        });
    }

    if line.contains("http") {
        return Some(Room::with_name(line, UNKNOWN_PERFORMER));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_line_shapes() {
        let text =
            "\u{feff}# my rooms\n\n1,https://live.bilibili.com/1,Alice\nhttps://www.douyu.com/2\n";
        let rooms = parse_rooms(text);
        assert_eq!(
            rooms,
            vec![
                Room::with_name("https://live.bilibili.com/1", "Alice"),
                Room::with_name("https://www.douyu.com/2", UNKNOWN_PERFORMER),
            ]
        );
    }

    #[test]
    fn name_may_contain_commas() {
        let rooms = parse_rooms("3,https://www.twitch.tv/x,Big, Bold Name");
        assert_eq!(rooms[0].display_name.as_deref(), Some("Big, Bold Name"));
    }

    #[test]
    fn garbage_lines_are_skipped() {
        let rooms = parse_rooms("not a room\nhttps://www.douyu.com/2\n1,2\n");
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].url, "https://www.douyu.com/2");
    }

    #[test]
    fn duplicates_keep_first() {
        let text = "1,https://www.douyu.com/2,First\n2,https://www.douyu.com/2,Second\n";
        let rooms = parse_rooms(text);
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].display_name.as_deref(), Some("First"));
    }

    #[test]
    fn empty_name_is_absent() {
        let rooms = parse_rooms("1,https://www.douyu.com/2,  ");
        assert_eq!(rooms[0].display_name, None);
    }

    #[tokio::test]
    async fn file_source_reads_rooms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("URL_config.ini");
        std::fs::write(&path, "https://www.douyu.com/2\n").unwrap();

        let rooms = FileRoomSource::new(&path).load().await.unwrap();
        assert_eq!(rooms.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = FileRoomSource::new("/nonexistent/URL_config.ini");
        assert!(source.load().await.is_err());
    }
}
