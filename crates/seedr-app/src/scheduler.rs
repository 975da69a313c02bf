//! Update and stat cadences.
//!
//! The update loop re-arms its timer only after a pass returns, so passes never
//! overlap however long a move wait takes. The stat loop runs on a fixed-rate
//! ticker; both share the connection guard and stop when the token is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::report::PassReport;
use crate::retention::RetentionEngine;
use crate::stats::StatReporter;

/// Run one pass and log its outcome.
///
/// # Errors
///
/// Returns the pass error after logging it.
pub async fn run_logged_pass(
    engine: &RetentionEngine,
    cancel: &CancellationToken,
) -> AppResult<PassReport> {
    let started = Instant::now();
    match engine.run_pass(cancel).await {
        Ok(report) => {
            info!(
                tiers = report.tiers.len(),
                evicted = report.eviction_count(),
                failed = report.failure_count(),
                dry_run = report.dry_run,
                cancelled = report.cancelled,
                elapsed_ms = started.elapsed().as_millis(),
                "eviction pass finished"
            );
            Ok(report)
        }
        Err(err) => {
            error!(error = %err, elapsed_ms = started.elapsed().as_millis(), "eviction pass failed");
            Err(err)
        }
    }
}

/// Run eviction passes until `cancel` fires, sleeping `every` between them.
pub async fn run_update_loop(
    engine: Arc<RetentionEngine>,
    every: Duration,
    cancel: CancellationToken,
) {
    debug!(interval_ms = every.as_millis(), "update loop started");
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = sleep(every) => {}
        }
        // Failures are already logged; the next tick retries from scratch.
        let _ = run_logged_pass(&engine, &cancel).await;
    }
    debug!("update loop stopped");
}

/// Log a client summary every `every` until `cancel` fires.
pub async fn run_stat_loop(reporter: StatReporter, every: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(interval_ms = every.as_millis(), "stat loop started");
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(err) = reporter.report().await {
                    warn!(error = %err, "failed to collect torrent statistics");
                }
            }
        }
    }
    debug!("stat loop stopped");
}

/// Handles for the two background cadences.
pub struct Scheduler {
    update: JoinHandle<()>,
    stat: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn both loops on the current runtime.
    #[must_use]
    pub fn spawn(
        engine: Arc<RetentionEngine>,
        reporter: StatReporter,
        update_interval: Duration,
        stat_interval: Duration,
        cancel: &CancellationToken,
    ) -> Self {
        Self {
            update: tokio::spawn(run_update_loop(engine, update_interval, cancel.clone())),
            stat: tokio::spawn(run_stat_loop(reporter, stat_interval, cancel.clone())),
        }
    }

    /// Wait for both loops to exit.
    pub async fn join(self) {
        for (name, handle) in [("update", self.update), ("stat", self.stat)] {
            if let Err(err) = handle.await {
                error!(error = %err, task = name, "scheduler task panicked");
            }
        }
    }
}
