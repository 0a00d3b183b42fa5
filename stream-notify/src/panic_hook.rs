use chrono::Local;
use std::{
    backtrace::Backtrace,
    fmt,
    fs::OpenOptions,
    io::Write,
    panic::{PanicHookInfo, take_hook},
    path::{Path, PathBuf},
    thread,
};

use crate::logging::LOG_FILE_PREFIX;

/// Routes panics through `tracing` before handing them to the previous hook.
///
/// Release builds abort on panic and the non-blocking file writer may never
/// flush, so in that case the record is also appended to today's log file.
pub fn install(log_dir: impl AsRef<Path>) {
    let log_dir = log_dir.as_ref().to_path_buf();
    let previous_hook = take_hook();

    std::panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let record = PanicRecord::capture(info);
            tracing::error!(target: "stream_notify::panic", "{record}");

            if cfg!(panic = "abort") {
                let _ = record.append_to(&log_dir);
            }
        }));

        previous_hook(info);
    }));
}

struct PanicRecord {
    timestamp: String,
    thread: String,
    location: String,
    payload: String,
    backtrace: Backtrace,
}

impl PanicRecord {
    fn capture(info: &PanicHookInfo<'_>) -> Self {
        let payload = info
            .payload()
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| info.to_string());

        Self {
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
            thread: thread::current().name().unwrap_or("<unnamed>").to_string(),
            location: info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "<unknown>".to_string()),
            payload,
            backtrace: Backtrace::force_capture(),
        }
    }

    fn append_to(&self, log_dir: &Path) -> std::io::Result<()> {
        let filename = format!("{LOG_FILE_PREFIX}.{}", Local::now().format("%Y-%m-%d"));
        let path = PathBuf::from(log_dir).join(filename);

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{self}")?;
        file.flush()
    }
}

impl fmt::Display for PanicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} PANIC thread={} location={} payload={}\nBacktrace:\n{}",
            self.timestamp, self.thread, self.location, self.payload, self.backtrace
        )
    }
}
