//! Process wiring: builds the monitor from configuration and listens for
//! shutdown signals.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::Result;
use crate::config::AppConfig;
use crate::monitor::{StreamDetector, StreamMonitor, StreamMonitorConfig};
use crate::notification::NotificationService;
use crate::rooms::FileRoomSource;

/// Timeout applied to every push channel request.
const PUSH_TIMEOUT: Duration = Duration::from_secs(15);

/// Builds a ready-to-run monitor from `config`, reading rooms from `rooms_path`.
pub fn build_monitor(config: &AppConfig, rooms_path: impl Into<PathBuf>) -> Result<StreamMonitor> {
    let probe_client = platforms_probe::default_client_with_proxy(config.global.proxy.as_deref())
        .map_err(|e| crate::Error::config(format!("failed to build probe HTTP client: {e}")))?;
    let registry = platforms_probe::default_registry(probe_client);
    info!(platforms = ?registry.platform_names(), "Platform adapters registered");

    let detector = StreamDetector::new(
        registry,
        Duration::from_secs(config.global.probe_timeout_secs),
    )
    .with_cookies(config.cookies.clone());

    let push_client = reqwest::Client::builder().timeout(PUSH_TIMEOUT).build()?;
    let notifier = NotificationService::from_config(&config.push, push_client);

    let queue_delay = Duration::try_from_secs_f64(config.global.queue_delay_secs)
        .map_err(|e| crate::Error::config(format!("invalid global.queue_delay_secs: {e}")))?;
    let monitor_config = StreamMonitorConfig::new(
        Duration::from_secs(config.interval_secs()),
        config.global.max_concurrent_probes,
        queue_delay,
    );

    Ok(StreamMonitor::new(
        monitor_config,
        Arc::new(FileRoomSource::new(rooms_path)),
        Arc::new(detector),
        Arc::new(notifier),
    ))
}

/// Cancels `token` on Ctrl-C or, on unix, SIGTERM.
pub fn spawn_shutdown_listener(token: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        token.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
