//! Process wiring: configuration, logging, driver, engine and scheduler.

use std::path::PathBuf;
use std::sync::Arc;

use seedr_config::{ConfigSnapshot, load_config};
use seedr_fsops::{DiskProbe, StatvfsProbe};
use seedr_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging, record_driver};
use seedr_torrent_core::{ConnectionGuard, TorrentDriver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::drivers::DriverRegistry;
use crate::error::{AppError, AppResult};
use crate::retention::{RetentionEngine, RetentionPolicy};
use crate::scheduler::{Scheduler, run_logged_pass};
use crate::stats::StatReporter;
use crate::tiers::TierTable;

/// Options collected from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
    /// Force dry-run mode on.
    pub dry_run: bool,
    /// Run one pass and exit instead of scheduling.
    pub once: bool,
    /// Log level overriding the configuration.
    pub log_level: Option<String>,
}

impl RunOptions {
    /// Fold command-line overrides into a loaded snapshot.
    pub fn apply(&self, snapshot: &mut ConfigSnapshot) {
        if self.dry_run {
            snapshot.general.dry_run = true;
        }
        if let Some(level) = &self.log_level {
            snapshot.log.level.clone_from(level);
        }
    }

    const fn mode(&self) -> &'static str {
        if self.once { "once" } else { "daemon" }
    }
}

/// Entry point for the `seedr` binary.
///
/// # Errors
///
/// Returns configuration, logging and driver construction failures, a failed
/// connection, or the error of a `--once` pass.
pub async fn run_app(options: RunOptions) -> AppResult<()> {
    let mut snapshot = load_config(options.config_path.as_deref())
        .map_err(|err| AppError::config("config.load", err))?;
    options.apply(&mut snapshot);

    let format = snapshot
        .log
        .format
        .as_deref()
        .map(str::parse::<LogFormat>)
        .transpose()
        .map_err(|err| AppError::telemetry("telemetry.log_format", err))?
        .unwrap_or_else(LogFormat::infer);
    let logging = LoggingConfig {
        level: &snapshot.log.level,
        format,
        build_sha: option_env!("SEEDR_BUILD_SHA").unwrap_or(env!("CARGO_PKG_VERSION")),
    };
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new(options.mode());
    info!(
        config = ?snapshot.source,
        tiers = snapshot.tiers.len(),
        dry_run = snapshot.general.dry_run,
        "seedr starting"
    );

    let driver = DriverRegistry::default().create(&snapshot.client)?;
    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    run_with(snapshot, driver, Arc::new(StatvfsProbe), options.once, cancel).await
}

/// Run against injected collaborators until `cancel` fires, or for one pass.
///
/// # Errors
///
/// Returns connection and metrics setup failures, or the error of a single pass
/// when `once` is set.
pub async fn run_with(
    snapshot: ConfigSnapshot,
    driver: Arc<dyn TorrentDriver>,
    probe: Arc<dyn DiskProbe>,
    once: bool,
    cancel: CancellationToken,
) -> AppResult<()> {
    let guard = ConnectionGuard::new(driver);
    record_driver(guard.driver_name());
    guard
        .connect()
        .await
        .map_err(|err| AppError::torrent("driver.connect", err))?;
    match guard.client_version().await {
        Ok(version) => info!(driver = guard.driver_name(), version = %version, "connected to torrent client"),
        Err(err) => debug!(error = %err, "torrent client version unavailable"),
    }

    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let tiers = TierTable::new(&snapshot.tiers);
    for (index, tier) in tiers.tiers_by_priority().iter().enumerate() {
        info!(
            index,
            path = %tier.path.display(),
            priority = tier.priority,
            min_free_bytes = ?tier.space.min_free_bytes,
            max_used_percent = ?tier.space.max_used_percent,
            max_ratio = ?tier.ratio_limit(),
            last = tiers.is_last(index),
            "configured tier"
        );
    }
    if snapshot.general.dry_run {
        warn!(dry_run = true, "dry-run mode: torrents will not be moved or deleted");
    }

    let engine = Arc::new(RetentionEngine::new(
        guard.clone(),
        probe,
        tiers,
        RetentionPolicy::from_settings(&snapshot.general),
        metrics.clone(),
    ));

    let result = if once {
        run_logged_pass(&engine, &cancel).await.map(|_| ())
    } else {
        let scheduler = Scheduler::spawn(
            engine,
            StatReporter::new(guard.clone(), metrics),
            snapshot.general.update_interval,
            snapshot.general.stat_interval,
            &cancel,
        );
        scheduler.join().await;
        Ok(())
    };

    if let Err(err) = guard.close().await {
        warn!(error = %err, "failed to close torrent client session");
    }
    info!("seedr stopped");
    result
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => info!("shutdown requested"),
            Err(err) => error!(error = %err, "failed to listen for shutdown signal"),
        }
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn shutdown_signal() -> AppResult<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())
        .map_err(|err| AppError::io("signal.terminate", err))?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map_err(|err| AppError::io("signal.ctrl_c", err)),
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> AppResult<()> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|err| AppError::io("signal.ctrl_c", err))
}
