//! Tiered eviction engine.
//!
//! # Design
//! - One pass walks tiers strictly in priority order; within a tier the space
//!   rule runs before the ratio rule and candidates are handled one at a time.
//! - The space rule stops as soon as the projected usage clears the threshold;
//!   the ratio rule evicts every torrent above the ceiling.
//! - Moves issued for a tier are confirmed before the next tier is probed.
//!   The connection guard is only held per call, never across the poll sleep.
//! - Per-candidate failures are logged and skipped; probe and listing failures
//!   abort the pass.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use seedr_config::{DEFAULT_MOVE_POLL_INTERVAL, GeneralSettings};
use seedr_fsops::DiskProbe;
use seedr_telemetry::Metrics;
use seedr_torrent_core::{ConnectionGuard, Torrent, TorrentState};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::directory::TorrentDirectory;
use crate::error::{AppError, AppResult};
use crate::report::{Eviction, EvictionAction, EvictionRule, PassReport, TierReport};
use crate::tiers::{EvictionTarget, Tier, TierTable};

/// Polls between "still waiting" warnings.
const WAIT_WARN_EVERY: u32 = 12;

/// Behaviour switches for eviction passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Log actions instead of issuing them.
    pub dry_run: bool,
    /// Delay between move-completion polls.
    pub move_poll_interval: Duration,
    /// Abort the pass when moves take longer than this.
    pub move_timeout: Option<Duration>,
}

impl RetentionPolicy {
    /// Policy derived from the `general:` configuration section.
    #[must_use]
    pub const fn from_settings(settings: &GeneralSettings) -> Self {
        Self {
            dry_run: settings.dry_run,
            move_poll_interval: settings.move_poll_interval,
            move_timeout: settings.move_timeout,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            dry_run: false,
            move_poll_interval: DEFAULT_MOVE_POLL_INTERVAL,
            move_timeout: None,
        }
    }
}

/// Moves issued but not yet confirmed, keyed by hash.
type PendingMoves = BTreeMap<String, PathBuf>;

enum Flow {
    Continue,
    Cancelled,
}

/// Applies space and ratio rules across the tier table.
pub struct RetentionEngine {
    guard: ConnectionGuard,
    probe: Arc<dyn DiskProbe>,
    tiers: TierTable,
    policy: RetentionPolicy,
    metrics: Metrics,
}

impl RetentionEngine {
    /// Assemble an engine over a shared client connection.
    #[must_use]
    pub fn new(
        guard: ConnectionGuard,
        probe: Arc<dyn DiskProbe>,
        tiers: TierTable,
        policy: RetentionPolicy,
        metrics: Metrics,
    ) -> Self {
        Self {
            guard,
            probe,
            tiers,
            policy,
            metrics,
        }
    }

    /// Tier table the engine walks.
    #[must_use]
    pub const fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Run one eviction pass over every tier.
    ///
    /// Cancellation is honoured before each tier and between move polls; a
    /// cancelled pass returns `Ok` with [`PassReport::cancelled`] set.
    ///
    /// # Errors
    ///
    /// Returns an error when the torrent listing or a disk probe fails, or when
    /// pending moves exceed the configured timeout.
    pub async fn run_pass(&self, cancel: &CancellationToken) -> AppResult<PassReport> {
        let mut report = PassReport::new(self.policy.dry_run);
        let result = self.walk_tiers(cancel, &mut report).await;
        self.metrics.set_pending_moves(0);
        let outcome = match &result {
            Ok(()) if report.cancelled => "cancelled",
            Ok(()) => "completed",
            Err(_) => "failed",
        };
        self.metrics.inc_pass(outcome);
        result.map(|()| report)
    }

    async fn walk_tiers(
        &self,
        cancel: &CancellationToken,
        report: &mut PassReport,
    ) -> AppResult<()> {
        let mut directory =
            TorrentDirectory::snapshot(&self.guard, &TorrentDirectory::eligible_filter())
                .await
                .map_err(|source| AppError::torrent("directory.snapshot", source))?;
        debug!(
            torrents = directory.len(),
            tiers = self.tiers.len(),
            dry_run = self.policy.dry_run,
            "starting eviction pass"
        );

        for (index, tier) in self.tiers.tiers_by_priority().iter().enumerate() {
            if cancel.is_cancelled() {
                info!(tier = %tier.path.display(), "eviction pass cancelled");
                report.cancelled = true;
                return Ok(());
            }
            let mut tier_report = TierReport::new(tier.path.clone());
            let flow = self
                .process_tier(index, tier, &mut directory, &mut tier_report, cancel)
                .await;
            report.tiers.push(tier_report);
            if let Flow::Cancelled = flow? {
                report.cancelled = true;
                return Ok(());
            }
        }
        Ok(())
    }

    async fn process_tier(
        &self,
        index: usize,
        tier: &Tier,
        directory: &mut TorrentDirectory,
        tier_report: &mut TierReport,
        cancel: &CancellationToken,
    ) -> AppResult<Flow> {
        let target = self.tiers.eviction_target(index);
        let usage = self
            .probe
            .usage(&tier.path)
            .map_err(|source| AppError::probe("probe.usage", tier.path.clone(), source))?;
        let mut pending = PendingMoves::new();

        tier_report.space_pressure = tier.space_pressure(&usage);
        if tier_report.space_pressure {
            info!(
                tier = %tier.path.display(),
                free_bytes = usage.free_bytes,
                used_percent = usage.used_percent(),
                "tier is under space pressure"
            );
            let mut projected = usage;
            for torrent in directory.space_candidates(&self.tiers, index) {
                if !self
                    .evict(&torrent, EvictionRule::Space, target, tier_report, &mut pending)
                    .await
                {
                    continue;
                }
                directory.mark_evicted(&torrent.hash);
                projected = projected.released(torrent.size_bytes);
                if !tier.space_pressure(&projected) {
                    debug!(
                        tier = %tier.path.display(),
                        projected_free_bytes = projected.free_bytes,
                        "space threshold met"
                    );
                    break;
                }
            }
        }
        if let Flow::Cancelled = self.await_moves(&mut pending, cancel).await? {
            return Ok(Flow::Cancelled);
        }

        if let Some(limit) = tier.ratio_limit() {
            for torrent in directory.ratio_candidates(&self.tiers, index) {
                if torrent.ratio <= limit || torrent.ratio.is_nan() {
                    continue;
                }
                if self
                    .evict(&torrent, EvictionRule::Ratio, target, tier_report, &mut pending)
                    .await
                {
                    directory.mark_evicted(&torrent.hash);
                }
            }
        }
        self.await_moves(&mut pending, cancel).await
    }

    /// Apply `target` to `torrent`; returns whether the eviction counts as done.
    async fn evict(
        &self,
        torrent: &Torrent,
        rule: EvictionRule,
        target: EvictionTarget<'_>,
        tier_report: &mut TierReport,
        pending: &mut PendingMoves,
    ) -> bool {
        let (action, destination) = match target {
            EvictionTarget::Move(next) => (EvictionAction::Move, Some(next.path.clone())),
            EvictionTarget::Delete => (EvictionAction::Delete, None),
        };
        let eviction = Eviction {
            hash: torrent.hash.clone(),
            rule,
            action,
            destination,
            size_bytes: torrent.size_bytes,
        };

        if self.policy.dry_run {
            info!(
                dry_run = true,
                hash = %torrent.hash,
                name = %torrent.name,
                rule = %rule,
                action = %action,
                destination = ?eviction.destination,
                size_bytes = torrent.size_bytes,
                ratio = torrent.ratio,
                "[dry-run] would evict torrent"
            );
            tier_report.evictions.push(eviction);
            return true;
        }

        let result = match target {
            EvictionTarget::Move(next) => {
                self.guard
                    .move_torrent(&torrent.hash, &next.destination())
                    .await
            }
            EvictionTarget::Delete => self.guard.remove_torrent(&torrent.hash, true).await,
        };
        match result {
            Ok(()) => {
                info!(
                    hash = %torrent.hash,
                    name = %torrent.name,
                    rule = %rule,
                    action = %action,
                    destination = ?eviction.destination,
                    size_bytes = torrent.size_bytes,
                    ratio = torrent.ratio,
                    "evicted torrent"
                );
                self.metrics.inc_eviction(rule.as_str(), action.as_str());
                if let Some(destination) = &eviction.destination {
                    pending.insert(torrent.hash.clone(), destination.clone());
                }
                tier_report.evictions.push(eviction);
                true
            }
            Err(err) => {
                warn!(
                    error = %err,
                    hash = %torrent.hash,
                    name = %torrent.name,
                    rule = %rule,
                    action = %action,
                    "failed to evict torrent; continuing with next candidate"
                );
                self.metrics.inc_eviction_failure(action.as_str());
                tier_report.failures.push(eviction);
                false
            }
        }
    }

    /// Poll every pending move until none reports `Moving`.
    async fn await_moves(
        &self,
        pending: &mut PendingMoves,
        cancel: &CancellationToken,
    ) -> AppResult<Flow> {
        if pending.is_empty() {
            return Ok(Flow::Continue);
        }
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            self.metrics.set_pending_moves(pending.len());
            let hashes: Vec<String> = pending.keys().cloned().collect();
            for hash in hashes {
                match self.guard.torrent(&hash).await {
                    Ok(torrent) if torrent.state == TorrentState::Moving => {
                        debug!(hash = %hash, "torrent still moving");
                    }
                    Ok(torrent) => {
                        info!(
                            hash = %hash,
                            location = %torrent.download_location,
                            state = %torrent.state,
                            "torrent move completed"
                        );
                        pending.remove(&hash);
                    }
                    Err(err) if err.is_unknown_torrent() => {
                        info!(hash = %hash, "torrent vanished while moving; treating move as complete");
                        pending.remove(&hash);
                    }
                    Err(err) => {
                        warn!(error = %err, hash = %hash, "failed to check move status; will retry");
                    }
                }
            }
            if pending.is_empty() {
                self.metrics.set_pending_moves(0);
                return Ok(Flow::Continue);
            }

            polls = polls.saturating_add(1);
            let waited = started.elapsed();
            if polls % WAIT_WARN_EVERY == 0 {
                warn!(
                    pending = pending.len(),
                    waited_secs = waited.as_secs(),
                    "still waiting for torrent moves to complete"
                );
            }
            if let Some(timeout) = self.policy.move_timeout
                && waited >= timeout
            {
                return Err(AppError::MoveTimeout {
                    pending: pending.keys().cloned().collect(),
                    waited,
                });
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(pending = pending.len(), "move wait cancelled");
                    return Ok(Flow::Cancelled);
                }
                () = sleep(self.policy.move_poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use seedr_config::{SpaceThreshold, TierConfig};
    use seedr_fsops::DiskUsage;
    use seedr_test_support::{DriverCall, FakeDriver, FakeProbe, disk, torrent};

    use super::*;

    const POLL: Duration = Duration::from_millis(1);

    fn tier(path: &str, priority: i32, min_free: Option<u64>, max_ratio: f64) -> TierConfig {
        TierConfig {
            path: PathBuf::from(path),
            priority,
            space: SpaceThreshold {
                min_free_bytes: min_free,
                max_used_percent: None,
            },
            max_ratio,
        }
    }

    fn policy(dry_run: bool) -> RetentionPolicy {
        RetentionPolicy {
            dry_run,
            move_poll_interval: POLL,
            move_timeout: None,
        }
    }

    struct Harness {
        driver: Arc<FakeDriver>,
        probe: Arc<FakeProbe>,
        metrics: Metrics,
        engine: RetentionEngine,
    }

    fn harness(
        driver: FakeDriver,
        tiers: &[TierConfig],
        usage: &[(&str, DiskUsage)],
        policy: RetentionPolicy,
    ) -> anyhow::Result<Harness> {
        let driver = Arc::new(driver);
        let mut probe = FakeProbe::new();
        for (path, reading) in usage {
            probe = probe.with_usage(*path, *reading);
        }
        let probe = Arc::new(probe);
        let metrics = Metrics::new()?;
        let engine = RetentionEngine::new(
            ConnectionGuard::new(driver.clone()),
            probe.clone(),
            TierTable::new(tiers),
            policy,
            metrics.clone(),
        );
        Ok(Harness {
            driver,
            probe,
            metrics,
            engine,
        })
    }

    #[tokio::test]
    async fn non_last_tiers_move_and_last_tier_deletes() -> anyhow::Result<()> {
        let h = harness(
            FakeDriver::new(vec![
                torrent("fast-old", "/fast", 10, 0.0, 1),
                torrent("slow-old", "/slow", 10, 0.0, 1),
            ]),
            &[tier("/fast", 1, Some(100), -1.0), tier("/slow", 0, Some(100), -1.0)],
            &[("/fast", disk(95, 5)), ("/slow", disk(95, 5))],
            policy(false),
        )?;

        let report = h.engine.run_pass(&CancellationToken::new()).await?;

        assert_eq!(
            h.driver.moves(),
            vec![("fast-old".to_string(), "/slow".to_string())]
        );
        assert_eq!(h.driver.removals(), vec!["slow-old".to_string()]);
        assert!(h.driver.mutations().contains(&DriverCall::Remove {
            hash: "slow-old".to_string(),
            delete_data: true,
        }));
        assert_eq!(report.tiers[0].moved(), ["fast-old"]);
        assert_eq!(report.tiers[1].deleted(), ["slow-old"]);
        assert_eq!(h.metrics.snapshot().evictions_total, 2);
        assert_eq!(h.metrics.snapshot().passes_completed, 1);
        Ok(())
    }

    #[tokio::test]
    async fn pending_moves_settle_before_next_tier_is_probed() -> anyhow::Result<()> {
        let h = harness(
            FakeDriver::new(vec![torrent("a", "/fast", 10, 0.0, 1)]).with_move_polls(3),
            &[tier("/fast", 1, Some(100), -1.0), tier("/slow", 0, None, -1.0)],
            &[("/fast", disk(50, 50)), ("/slow", disk(1_000, 0))],
            policy(false),
        )?;

        h.engine.run_pass(&CancellationToken::new()).await?;

        assert_eq!(h.driver.status_polls("a"), 4);
        let calls = h.driver.calls();
        let last_status = calls
            .iter()
            .rposition(|call| matches!(call, DriverCall::Status { .. }))
            .ok_or_else(|| anyhow::anyhow!("no status polls"))?;
        assert_eq!(last_status, calls.len() - 1);
        assert_eq!(
            h.probe.probed(),
            vec![PathBuf::from("/fast"), PathBuf::from("/slow")]
        );
        assert_eq!(h.metrics.snapshot().pending_moves, 0);
        Ok(())
    }

    #[tokio::test]
    async fn space_rule_stops_once_projection_clears_threshold() -> anyhow::Result<()> {
        let h = harness(
            FakeDriver::new(vec![
                torrent("third", "/fast", 10, 0.0, 30),
                torrent("first", "/fast", 60, 0.0, 10),
                torrent("second", "/fast", 10, 0.0, 20),
            ]),
            &[tier("/fast", 1, Some(100), -1.0), tier("/slow", 0, None, -1.0)],
            &[("/fast", disk(50, 950)), ("/slow", disk(1_000, 0))],
            policy(false),
        )?;

        let report = h.engine.run_pass(&CancellationToken::new()).await?;

        assert_eq!(h.driver.moves(), vec![("first".to_string(), "/slow".to_string())]);
        assert!(report.tiers[0].space_pressure);
        assert!(!report.tiers[1].space_pressure);
        Ok(())
    }

    #[tokio::test]
    async fn space_rule_evicts_oldest_first() -> anyhow::Result<()> {
        let h = harness(
            FakeDriver::new(vec![
                torrent("newest", "/fast", 10, 0.0, 300),
                torrent("oldest", "/fast", 10, 0.0, 100),
                torrent("middle", "/fast", 10, 0.0, 200),
            ]),
            &[tier("/fast", 0, Some(1_000), -1.0)],
            &[("/fast", disk(0, 30))],
            policy(false),
        )?;

        h.engine.run_pass(&CancellationToken::new()).await?;

        assert_eq!(h.driver.removals(), ["oldest", "middle", "newest"]);
        Ok(())
    }

    #[tokio::test]
    async fn no_pressure_means_no_actions() -> anyhow::Result<()> {
        let h = harness(
            FakeDriver::new(vec![torrent("a", "/fast", 10, 5.0, 1)]),
            &[tier("/fast", 1, Some(100), -1.0), tier("/slow", 0, Some(100), -1.0)],
            &[("/fast", disk(500, 0)), ("/slow", disk(500, 0))],
            policy(false),
        )?;

        let first = h.engine.run_pass(&CancellationToken::new()).await?;
        let second = h.engine.run_pass(&CancellationToken::new()).await?;

        assert!(h.driver.mutations().is_empty());
        assert_eq!(first, second);
        assert_eq!(first.eviction_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn ratio_rule_evicts_every_torrent_above_limit() -> anyhow::Result<()> {
        let h = harness(
            FakeDriver::new(vec![
                torrent("r30", "/fast", 10, 3.0, 1),
                torrent("r25", "/fast", 10, 2.5, 2),
                torrent("r10", "/fast", 10, 1.0, 3),
                torrent("r21", "/fast", 10, 2.1, 4),
                torrent("r20", "/fast", 10, 2.0, 5),
            ])
            .with_move_polls(2),
            &[tier("/fast", 1, None, 2.0), tier("/slow", 0, None, -1.0)],
            &[("/fast", disk(1_000, 0)), ("/slow", disk(1_000, 0))],
            policy(false),
        )?;

        let report = h.engine.run_pass(&CancellationToken::new()).await?;

        let moved: Vec<_> = h.driver.moves().into_iter().map(|(hash, _)| hash).collect();
        assert_eq!(moved, ["r30", "r25", "r21"]);
        assert!(report.evictions().all(|e| e.rule == EvictionRule::Ratio));
        assert_eq!(h.driver.status_polls("r30"), 3);
        Ok(())
    }

    #[tokio::test]
    async fn ratio_rule_skips_torrents_evicted_for_space() -> anyhow::Result<()> {
        let h = harness(
            FakeDriver::new(vec![
                torrent("old-high", "/fast", 10, 5.0, 1),
                torrent("new-high", "/fast", 10, 4.0, 2),
            ]),
            &[tier("/fast", 0, Some(55), 1.0)],
            &[("/fast", disk(50, 50))],
            policy(false),
        )?;

        let report = h.engine.run_pass(&CancellationToken::new()).await?;

        assert_eq!(h.driver.removals(), ["old-high", "new-high"]);
        let rules: Vec<_> = report.evictions().map(|e| e.rule).collect();
        assert_eq!(rules, [EvictionRule::Space, EvictionRule::Ratio]);
        Ok(())
    }

    #[tokio::test]
    async fn dry_run_selects_the_same_victims_without_mutations() -> anyhow::Result<()> {
        let torrents = || {
            vec![
                torrent("first", "/fast", 60, 3.0, 10),
                torrent("second", "/fast", 10, 0.5, 20),
                torrent("third", "/fast", 10, 2.5, 30),
                torrent("slow", "/slow", 10, 0.0, 1),
            ]
        };
        let tiers = [tier("/fast", 1, Some(100), 2.0), tier("/slow", 0, Some(100), -1.0)];
        let usage = [("/fast", disk(50, 950)), ("/slow", disk(10, 990))];

        let live = harness(FakeDriver::new(torrents()), &tiers, &usage, policy(false))?;
        let dry = harness(FakeDriver::new(torrents()), &tiers, &usage, policy(true))?;
        let live_report = live.engine.run_pass(&CancellationToken::new()).await?;
        let dry_report = dry.engine.run_pass(&CancellationToken::new()).await?;

        assert!(dry.driver.mutations().is_empty());
        assert!(dry_report.dry_run);
        assert_eq!(live_report.tiers, dry_report.tiers);
        let selected: Vec<_> = dry_report.evictions().map(|e| e.hash.as_str()).collect();
        assert_eq!(selected, ["first", "third", "slow"]);
        assert_eq!(dry.metrics.snapshot().evictions_total, 0);
        Ok(())
    }

    #[tokio::test]
    async fn failed_move_does_not_block_later_candidates() -> anyhow::Result<()> {
        let driver = FakeDriver::new(vec![
            torrent("broken", "/fast", 100, 0.0, 1),
            torrent("next", "/fast", 100, 0.0, 2),
        ]);
        driver.fail_move("broken");
        let h = harness(
            driver,
            &[tier("/fast", 1, Some(100), -1.0), tier("/slow", 0, None, -1.0)],
            &[("/fast", disk(50, 950)), ("/slow", disk(1_000, 0))],
            policy(false),
        )?;

        let report = h.engine.run_pass(&CancellationToken::new()).await?;

        let attempted: Vec<_> = h.driver.moves().into_iter().map(|(hash, _)| hash).collect();
        assert_eq!(attempted, ["broken", "next"]);
        assert_eq!(report.tiers[0].failed(), ["broken"]);
        assert_eq!(report.tiers[0].moved(), ["next"]);
        assert_eq!(h.metrics.snapshot().eviction_failures_total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_delete_does_not_block_later_candidates() -> anyhow::Result<()> {
        let driver = FakeDriver::new(vec![
            torrent("broken", "/slow", 10, 0.0, 1),
            torrent("next", "/slow", 10, 0.0, 2),
        ]);
        driver.fail_remove("broken");
        let h = harness(
            driver,
            &[tier("/slow", 0, Some(100), -1.0)],
            &[("/slow", disk(50, 950))],
            policy(false),
        )?;

        let report = h.engine.run_pass(&CancellationToken::new()).await?;

        assert_eq!(h.driver.removals(), ["broken", "next"]);
        assert_eq!(report.tiers[0].failed(), ["broken"]);
        assert_eq!(report.tiers[0].deleted(), ["next"]);
        assert_eq!(h.driver.torrents().len(), 1);
        assert_eq!(h.metrics.snapshot().eviction_failures_total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn probe_failure_aborts_the_pass() -> anyhow::Result<()> {
        let probe_fail = harness(
            FakeDriver::new(vec![torrent("slow", "/slow", 10, 9.0, 1)]),
            &[tier("/fast", 1, Some(100), -1.0), tier("/slow", 0, None, 1.0)],
            &[("/slow", disk(0, 10))],
            policy(false),
        )?;

        let err = probe_fail
            .engine
            .run_pass(&CancellationToken::new())
            .await
            .expect_err("missing probe reading must fail");

        assert!(matches!(err, AppError::Probe { ref path, .. } if path == Path::new("/fast")));
        assert!(probe_fail.driver.mutations().is_empty());
        assert_eq!(probe_fail.metrics.snapshot().passes_failed, 1);
        Ok(())
    }

    #[tokio::test]
    async fn listing_failure_aborts_before_probing() -> anyhow::Result<()> {
        let driver = FakeDriver::new(Vec::new());
        driver.fail_listing();
        let h = harness(
            driver,
            &[tier("/fast", 0, Some(100), -1.0)],
            &[("/fast", disk(0, 10))],
            policy(false),
        )?;

        let err = h
            .engine
            .run_pass(&CancellationToken::new())
            .await
            .expect_err("listing failure must fail the pass");

        assert!(matches!(err, AppError::Torrent { operation: "directory.snapshot", .. }));
        assert!(h.probe.probed().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn vanished_torrent_counts_as_moved() -> anyhow::Result<()> {
        let driver = FakeDriver::new(vec![torrent("ghost", "/fast", 10, 0.0, 1)]);
        driver.vanish_after_move("ghost");
        let h = harness(
            driver,
            &[tier("/fast", 1, Some(100), -1.0), tier("/slow", 0, None, -1.0)],
            &[("/fast", disk(50, 50)), ("/slow", disk(1_000, 0))],
            policy(false),
        )?;

        let report = h.engine.run_pass(&CancellationToken::new()).await?;

        assert_eq!(h.driver.status_polls("ghost"), 1);
        assert_eq!(report.tiers.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn status_errors_keep_move_pending() -> anyhow::Result<()> {
        let driver = FakeDriver::new(vec![torrent("flaky", "/fast", 10, 0.0, 1)]);
        driver.fail_status("flaky", 2);
        let h = harness(
            driver,
            &[tier("/fast", 1, Some(100), -1.0), tier("/slow", 0, None, -1.0)],
            &[("/fast", disk(50, 50)), ("/slow", disk(1_000, 0))],
            policy(false),
        )?;

        h.engine.run_pass(&CancellationToken::new()).await?;

        assert_eq!(h.driver.status_polls("flaky"), 3);
        Ok(())
    }

    #[tokio::test]
    async fn move_timeout_aborts_the_pass() -> anyhow::Result<()> {
        let h = harness(
            FakeDriver::new(vec![torrent("stuck", "/fast", 10, 0.0, 1)]).with_move_polls(usize::MAX),
            &[tier("/fast", 1, Some(100), -1.0), tier("/slow", 0, None, -1.0)],
            &[("/fast", disk(50, 50)), ("/slow", disk(1_000, 0))],
            RetentionPolicy {
                move_timeout: Some(Duration::from_millis(20)),
                ..policy(false)
            },
        )?;

        let err = h
            .engine
            .run_pass(&CancellationToken::new())
            .await
            .expect_err("stuck move must time out");

        match err {
            AppError::MoveTimeout { pending, waited } => {
                assert_eq!(pending, ["stuck"]);
                assert!(waited >= Duration::from_millis(20));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.probe.probed(), vec![PathBuf::from("/fast")]);
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_interrupts_move_wait() -> anyhow::Result<()> {
        let h = harness(
            FakeDriver::new(vec![torrent("stuck", "/fast", 10, 0.0, 1)]).with_move_polls(usize::MAX),
            &[tier("/fast", 1, Some(100), -1.0), tier("/slow", 0, None, -1.0)],
            &[("/fast", disk(50, 50)), ("/slow", disk(1_000, 0))],
            policy(false),
        )?;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let report = h.engine.run_pass(&cancel).await?;

        assert!(report.cancelled);
        assert_eq!(report.tiers.len(), 1);
        assert_eq!(h.probe.probed(), vec![PathBuf::from("/fast")]);
        assert_eq!(h.metrics.snapshot().passes_cancelled, 1);
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_token_skips_all_tiers() -> anyhow::Result<()> {
        let h = harness(
            FakeDriver::new(vec![torrent("a", "/fast", 10, 9.0, 1)]),
            &[tier("/fast", 0, Some(100), 1.0)],
            &[("/fast", disk(0, 10))],
            policy(false),
        )?;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = h.engine.run_pass(&cancel).await?;

        assert!(report.cancelled);
        assert!(report.tiers.is_empty());
        assert!(h.driver.mutations().is_empty());
        Ok(())
    }
}
