//! Logging setup.
//!
//! Console and daily-rotated file output share one `EnvFilter`. Timestamps use
//! the local timezone. Log files older than [`LOG_RETENTION_DAYS`] are removed
//! when logging starts.

use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default log filter directive, overridden by `RUST_LOG`.
pub const DEFAULT_LOG_FILTER: &str = "stream_notify=info,platforms_probe=info";

/// File name prefix of the rotated log files (`stream-notify.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "stream-notify.log";

/// Log retention period in days.
pub const LOG_RETENTION_DAYS: i64 = 7;

/// Formats timestamps in the local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Initializes the global subscriber.
///
/// Keep the returned guard alive for the lifetime of the process, dropping it
/// flushes the file writer.
pub fn init_logging(log_dir: impl AsRef<Path>) -> crate::Result<WorkerGuard> {
    let log_path = log_dir.as_ref().to_path_buf();
    std::fs::create_dir_all(&log_path)?;

    let file_appender = tracing_appender::rolling::daily(&log_path, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(LocalTimer),
        )
        .try_init()
        .map_err(|e| crate::Error::Other(format!("Failed to set global default subscriber: {e}")))?;

    let removed = cleanup_old_logs(&log_path, LOG_RETENTION_DAYS, Local::now().date_naive());
    if removed > 0 {
        info!(count = removed, "Cleaned up old log files");
    }

    Ok(guard)
}

/// Deletes rotated log files dated more than `retention_days` before `today`.
/// Returns the number of files removed.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: i64, today: NaiveDate) -> usize {
    let cutoff = today - chrono::Duration::days(retention_days);

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %log_dir.display(), error = %e, "Failed to read log directory");
            return 0;
        }
    };

    let stale: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(LOG_FILE_PREFIX))
                .and_then(|rest| rest.strip_prefix('.'))
                .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
                .is_some_and(|date| date < cutoff)
        })
        .collect();

    let mut removed = 0;
    for path in stale {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                removed += 1;
                debug!(path = %path.display(), "Deleted old log file");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete old log file"),
        }
    }
    removed
}
