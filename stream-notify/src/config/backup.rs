//! Timestamped backups of configuration files, taken once at startup.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::Result;

/// Number of backups kept per file.
pub const DEFAULT_BACKUP_LIMIT: usize = 6;

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Copies `source` into `backup_dir` as `<name>_<timestamp>.bak` and evicts
/// the oldest backups of that file beyond `limit`.
///
/// Returns `None` when `source` does not exist.
pub fn backup_file(
    source: &Path,
    backup_dir: &Path,
    limit: usize,
    now: DateTime<Local>,
) -> Result<Option<PathBuf>> {
    if !source.is_file() {
        debug!(path = %source.display(), "Nothing to back up");
        return Ok(None);
    }

    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            crate::Error::validation(format!("invalid file name: {}", source.display()))
        })?;

    std::fs::create_dir_all(backup_dir)?;
    let target = backup_dir.join(format!(
        "{file_name}_{}.bak",
        now.format(BACKUP_TIME_FORMAT)
    ));
    std::fs::copy(source, &target)?;
    debug!(from = %source.display(), to = %target.display(), "Backed up config file");

    let removed = prune_backups(backup_dir, file_name, limit)?;
    if removed > 0 {
        debug!(file = file_name, removed, "Removed old backups");
    }

    Ok(Some(target))
}

/// Deletes the oldest backups of `file_name` so at most `limit` remain.
pub fn prune_backups(backup_dir: &Path, file_name: &str, limit: usize) -> Result<usize> {
    let prefix = format!("{file_name}_");
    let mut backups: Vec<(SystemTime, PathBuf)> = std::fs::read_dir(backup_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".bak"))
        })
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect();

    if backups.len() <= limit {
        return Ok(0);
    }

    backups.sort();
    let excess = backups.len() - limit;
    let mut removed = 0;
    for (_, path) in backups.into_iter().take(excess) {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove old backup"),
        }
    }
    Ok(removed)
}

/// Backs up every file in `sources`. Failures are logged and never fatal.
pub fn backup_all(sources: &[&Path], backup_dir: &Path, limit: usize) {
    let now = Local::now();
    for source in sources {
        match backup_file(source, backup_dir, limit, now) {
            Ok(Some(target)) => info!(
                file = %source.display(),
                backup = %target.display(),
                "Config backup created"
            ),
            Ok(None) => {}
            Err(e) => warn!(file = %source.display(), error = %e, "Config backup failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn keeps_only_newest_backups() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("config.toml");
        std::fs::write(&source, "[global]\n").unwrap();
        let backup_dir = dir.path().join("backup_config");

        for second in 0..8 {
            let now = Local.with_ymd_and_hms(2024, 5, 20, 12, 0, second).unwrap();
            backup_file(&source, &backup_dir, 6, now).unwrap();
        }

        let mut names: Vec<String> = std::fs::read_dir(&backup_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();

        assert_eq!(names.len(), 6);
        assert_eq!(names[0], "config.toml_2024-05-20_12-00-02.bak");
        assert_eq!(names[5], "config.toml_2024-05-20_12-00-07.bak");
    }

    #[test]
    fn other_files_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let backup_dir = dir.path();
        for name in [
            "URL_config.ini_2024-01-01_00-00-00.bak",
            "config.toml_2024-01-01_00-00-00.bak",
            "config.toml_2024-01-02_00-00-00.bak",
        ] {
            std::fs::write(backup_dir.join(name), "x").unwrap();
        }

        let removed = prune_backups(backup_dir, "config.toml", 1).unwrap();

        assert_eq!(removed, 1);
        assert!(backup_dir.join("URL_config.ini_2024-01-01_00-00-00.bak").exists());
    }

    #[test]
    fn missing_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            backup_file(&dir.path().join("absent.ini"), dir.path(), 6, Local::now()).unwrap();
        assert!(result.is_none());
    }
}
