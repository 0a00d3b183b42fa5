use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use stream_notify::config::{AppConfig, backup};
use stream_notify::{app, logging, panic_hook};

/// Watches live rooms and pushes a notification when they go live or offline.
#[derive(Debug, Parser)]
#[command(name = "stream-notify", version, about)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, env = "STREAM_NOTIFY_CONFIG", default_value = "config/config.toml")]
    config: PathBuf,

    /// Room list, one room per line.
    #[arg(short, long, env = "STREAM_NOTIFY_ROOMS", default_value = "config/URL_config.ini")]
    rooms: PathBuf,

    /// Directory for startup backups of the two files above.
    #[arg(long, env = "STREAM_NOTIFY_BACKUP_DIR", default_value = "backup_config")]
    backup_dir: PathBuf,

    /// Log directory.
    #[arg(long, env = "STREAM_NOTIFY_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _guard = logging::init_logging(&cli.log_dir).context("failed to initialize logging")?;
    panic_hook::install(&cli.log_dir);

    info!(version = env!("CARGO_PKG_VERSION"), "stream-notify starting");

    backup::backup_all(
        &[cli.config.as_path(), cli.rooms.as_path()],
        &cli.backup_dir,
        backup::DEFAULT_BACKUP_LIMIT,
    );

    let config = AppConfig::load(&cli.config)
        .inspect_err(|e| error!(error = %e, "Fatal: cannot load configuration"))?;
    let monitor = app::build_monitor(&config, &cli.rooms)?;

    let cancel = CancellationToken::new();
    app::spawn_shutdown_listener(cancel.clone());

    monitor.run(cancel).await?;

    info!("stream-notify stopped");
    Ok(())
}
