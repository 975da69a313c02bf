//! Periodic transfer and state summary.

use std::collections::BTreeMap;

use seedr_telemetry::Metrics;
use seedr_torrent_core::{ConnectionGuard, StateFilter, Torrent, TorrentState};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Aggregate view of every torrent in the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Summed upload rate in bytes per second.
    pub upload_bps: u64,
    /// Summed download rate in bytes per second.
    pub download_bps: u64,
    /// Torrent count per state; states with no torrents are absent.
    pub states: BTreeMap<TorrentState, usize>,
}

impl TransferSummary {
    /// Summarise a full listing.
    #[must_use]
    pub fn from_torrents(torrents: &[Torrent]) -> Self {
        torrents.iter().fold(Self::default(), |mut summary, torrent| {
            summary.upload_bps = summary.upload_bps.saturating_add(torrent.transfer.upload_bps);
            summary.download_bps = summary
                .download_bps
                .saturating_add(torrent.transfer.download_bps);
            *summary.states.entry(torrent.state).or_default() += 1;
            summary
        })
    }

    /// Torrents currently in `state`.
    #[must_use]
    pub fn count(&self, state: TorrentState) -> usize {
        self.states.get(&state).copied().unwrap_or(0)
    }

    /// Total torrents summarised.
    #[must_use]
    pub fn total(&self) -> usize {
        self.states.values().sum()
    }
}

/// Logs a one-line client summary and refreshes the state gauges.
#[derive(Clone)]
pub struct StatReporter {
    guard: ConnectionGuard,
    metrics: Metrics,
}

impl StatReporter {
    /// Reporter sharing the engine's connection guard.
    #[must_use]
    pub const fn new(guard: ConnectionGuard, metrics: Metrics) -> Self {
        Self { guard, metrics }
    }

    /// List every torrent, log the summary and update gauges.
    ///
    /// # Errors
    ///
    /// Returns the driver error when the listing fails.
    pub async fn report(&self) -> AppResult<TransferSummary> {
        let torrents = self
            .guard
            .list_torrents(&StateFilter::Any)
            .await
            .map_err(|source| AppError::torrent("stats.list", source))?;
        let summary = TransferSummary::from_torrents(&torrents);

        info!(
            upload_bps = summary.upload_bps,
            download_bps = summary.download_bps,
            total = summary.total(),
            seeding = summary.count(TorrentState::Seeding),
            downloading = summary.count(TorrentState::Downloading),
            active = summary.count(TorrentState::Active),
            queued = summary.count(TorrentState::Queued),
            paused = summary.count(TorrentState::Paused),
            error = summary.count(TorrentState::Error),
            moving = summary.count(TorrentState::Moving),
            checking = summary.count(TorrentState::Checking),
            allocating = summary.count(TorrentState::Allocating),
            "↑ {}/s ↓ {}/s",
            format_bytes(summary.upload_bps),
            format_bytes(summary.download_bps),
        );

        self.metrics
            .set_transfer_rates(summary.upload_bps, summary.download_bps);
        for state in TorrentState::ALL {
            self.metrics
                .set_torrents_in_state(state.as_str(), summary.count(state));
        }
        match self.metrics.render() {
            Ok(rendered) => debug!(metrics = %rendered, "metrics snapshot"),
            Err(err) => warn!(error = %err, "failed to render metrics"),
        }
        Ok(summary)
    }
}

/// Human-readable SI byte count, e.g. `8.2 MB` or `82 MB`.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    if bytes < 10 {
        return format!("{bytes} B");
    }
    let mut divisor: u64 = 1;
    let mut unit = 0;
    while unit + 1 < UNITS.len() && bytes / divisor >= 1_000 {
        divisor *= 1_000;
        unit += 1;
    }
    // Tenths, rounded half up.
    let tenths = (u128::from(bytes) * 10 + u128::from(divisor) / 2) / u128::from(divisor);
    if tenths >= 100 {
        format!("{} {}", (tenths + 5) / 10, UNITS[unit])
    } else {
        format!("{}.{} {}", tenths / 10, tenths % 10, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use seedr_test_support::{FakeDriver, torrent};

    use super::*;

    #[test]
    fn format_bytes_matches_si_rendering() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(9), "9 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1_000), "1.0 kB");
        assert_eq!(format_bytes(8_200_000), "8.2 MB");
        assert_eq!(format_bytes(82_000_000), "82 MB");
        assert_eq!(format_bytes(u64::MAX), "18 EB");
    }

    #[test]
    fn summary_counts_states_and_sums_rates() {
        let mut downloading = torrent("d", "/fast", 1, 0.0, 1);
        downloading.state = TorrentState::Downloading;
        downloading.transfer.download_bps = 300;
        let mut seeding = torrent("s", "/fast", 1, 0.0, 2);
        seeding.transfer.upload_bps = 100;
        let mut other = torrent("o", "/fast", 1, 0.0, 3);
        other.transfer.upload_bps = 50;

        let summary = TransferSummary::from_torrents(&[downloading, seeding, other]);
        assert_eq!(summary.upload_bps, 150);
        assert_eq!(summary.download_bps, 300);
        assert_eq!(summary.count(TorrentState::Seeding), 2);
        assert_eq!(summary.count(TorrentState::Paused), 0);
        assert_eq!(summary.total(), 3);
    }

    #[tokio::test]
    async fn report_lists_every_state_and_updates_gauges() -> anyhow::Result<()> {
        let mut moving = torrent("m", "/fast", 1, 0.0, 1);
        moving.state = TorrentState::Moving;
        moving.transfer.upload_bps = 7;
        let driver = Arc::new(FakeDriver::new(vec![moving, torrent("s", "/fast", 1, 0.0, 2)]));
        let metrics = Metrics::new()?;
        let reporter = StatReporter::new(ConnectionGuard::new(driver), metrics.clone());

        let summary = reporter.report().await?;

        assert_eq!(summary.count(TorrentState::Moving), 1);
        assert_eq!(metrics.snapshot().upload_bps, 7);
        Ok(())
    }

    #[tokio::test]
    async fn report_surfaces_listing_failures() -> anyhow::Result<()> {
        let driver = Arc::new(FakeDriver::new(Vec::new()));
        driver.fail_listing();
        let reporter = StatReporter::new(ConnectionGuard::new(driver), Metrics::new()?);

        let err = reporter.report().await.expect_err("listing failure");
        assert!(matches!(err, AppError::Torrent { operation: "stats.list", .. }));
        Ok(())
    }
}
