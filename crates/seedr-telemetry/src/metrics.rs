//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Each `Metrics` owns its registry so tests and embedded runs never clash.
//! - Label values are plain strings; callers pass the names listed in
//!   [`EVICTION_RULES`], [`EVICTION_ACTIONS`] and [`PASS_OUTCOMES`].

use std::sync::Arc;

use prometheus::{
    Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
    core::Collector,
};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Rule labels used by the eviction counter.
pub const EVICTION_RULES: [&str; 2] = ["space", "ratio"];
/// Action labels used by the eviction counters.
pub const EVICTION_ACTIONS: [&str; 2] = ["move", "delete"];
/// Outcome labels used by the pass counter.
pub const PASS_OUTCOMES: [&str; 3] = ["completed", "failed", "cancelled"];

/// Prometheus-backed metrics registry shared across the daemon.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    evictions_total: IntCounterVec,
    eviction_failures_total: IntCounterVec,
    passes_total: IntCounterVec,
    pending_moves: IntGauge,
    torrents: IntGaugeVec,
    upload_bps: IntGauge,
    download_bps: IntGauge,
}

/// Snapshot of selected gauges and counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Successful evictions across all rules and actions.
    pub evictions_total: u64,
    /// Failed eviction attempts across all actions.
    pub eviction_failures_total: u64,
    /// Passes that ran to completion.
    pub passes_completed: u64,
    /// Passes aborted by an error.
    pub passes_failed: u64,
    /// Passes interrupted by shutdown.
    pub passes_cancelled: u64,
    /// Moves still being awaited.
    pub pending_moves: i64,
    /// Last observed aggregate upload rate.
    pub upload_bps: i64,
    /// Last observed aggregate download rate.
    pub download_bps: i64,
}

impl Metrics {
    /// Construct a new registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let evictions_total = IntCounterVec::new(
            Opts::new("seedr_evictions_total", "Torrents evicted by rule and action"),
            &["rule", "action"],
        )
        .map_err(|source| collector_error("seedr_evictions_total", source))?;
        let eviction_failures_total = IntCounterVec::new(
            Opts::new(
                "seedr_eviction_failures_total",
                "Eviction attempts rejected by the torrent client",
            ),
            &["action"],
        )
        .map_err(|source| collector_error("seedr_eviction_failures_total", source))?;
        let passes_total = IntCounterVec::new(
            Opts::new("seedr_passes_total", "Eviction passes by outcome"),
            &["outcome"],
        )
        .map_err(|source| collector_error("seedr_passes_total", source))?;
        let pending_moves = IntGauge::with_opts(Opts::new(
            "seedr_pending_moves",
            "Moves issued and not yet completed",
        ))
        .map_err(|source| collector_error("seedr_pending_moves", source))?;
        let torrents = IntGaugeVec::new(
            Opts::new("seedr_torrents", "Torrents known to the client by state"),
            &["state"],
        )
        .map_err(|source| collector_error("seedr_torrents", source))?;
        let upload_bps = IntGauge::with_opts(Opts::new(
            "seedr_upload_bps",
            "Aggregate upload rate in bytes per second",
        ))
        .map_err(|source| collector_error("seedr_upload_bps", source))?;
        let download_bps = IntGauge::with_opts(Opts::new(
            "seedr_download_bps",
            "Aggregate download rate in bytes per second",
        ))
        .map_err(|source| collector_error("seedr_download_bps", source))?;

        register(&registry, "seedr_evictions_total", &evictions_total)?;
        register(&registry, "seedr_eviction_failures_total", &eviction_failures_total)?;
        register(&registry, "seedr_passes_total", &passes_total)?;
        register(&registry, "seedr_pending_moves", &pending_moves)?;
        register(&registry, "seedr_torrents", &torrents)?;
        register(&registry, "seedr_upload_bps", &upload_bps)?;
        register(&registry, "seedr_download_bps", &download_bps)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                evictions_total,
                eviction_failures_total,
                passes_total,
                pending_moves,
                torrents,
                upload_bps,
                download_bps,
            }),
        })
    }

    /// Count a successful eviction.
    pub fn inc_eviction(&self, rule: &str, action: &str) {
        self.inner
            .evictions_total
            .with_label_values(&[rule, action])
            .inc();
    }

    /// Count an eviction the client rejected.
    pub fn inc_eviction_failure(&self, action: &str) {
        self.inner
            .eviction_failures_total
            .with_label_values(&[action])
            .inc();
    }

    /// Count a finished pass.
    pub fn inc_pass(&self, outcome: &str) {
        self.inner.passes_total.with_label_values(&[outcome]).inc();
    }

    /// Set the number of moves currently awaited.
    pub fn set_pending_moves(&self, count: usize) {
        self.inner.pending_moves.set(saturating_i64(count));
    }

    /// Set the number of torrents in `state`.
    pub fn set_torrents_in_state(&self, state: &str, count: usize) {
        self.inner
            .torrents
            .with_label_values(&[state])
            .set(saturating_i64(count));
    }

    /// Record the aggregate transfer rates.
    pub fn set_transfer_rates(&self, upload_bps: u64, download_bps: u64) {
        self.inner.upload_bps.set(saturating_i64(upload_bps));
        self.inner.download_bps.set(saturating_i64(download_bps));
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the counters and gauges.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = &self.inner;
        let evictions_total = EVICTION_RULES
            .iter()
            .flat_map(|rule| EVICTION_ACTIONS.iter().map(move |action| [*rule, *action]))
            .map(|labels| inner.evictions_total.with_label_values(&labels).get())
            .sum();
        let eviction_failures_total = EVICTION_ACTIONS
            .iter()
            .map(|action| {
                inner
                    .eviction_failures_total
                    .with_label_values(&[*action])
                    .get()
            })
            .sum();
        let pass = |outcome: &str| inner.passes_total.with_label_values(&[outcome]).get();

        MetricsSnapshot {
            evictions_total,
            eviction_failures_total,
            passes_completed: pass("completed"),
            passes_failed: pass("failed"),
            passes_cancelled: pass("cancelled"),
            pending_moves: inner.pending_moves.get(),
            upload_bps: inner.upload_bps.get(),
            download_bps: inner.download_bps.get(),
        }
    }
}

fn collector_error(name: &'static str, source: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsCollector { name, source }
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

fn saturating_i64(value: impl TryInto<i64>) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_i64_clamps_large_values() {
        assert_eq!(saturating_i64(u64::MAX), i64::MAX);
        assert_eq!(saturating_i64(42_usize), 42);
    }

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_eviction("space", "move");
        metrics.inc_eviction("ratio", "delete");
        metrics.inc_eviction("space", "move");
        metrics.inc_eviction_failure("delete");
        metrics.inc_pass("completed");
        metrics.inc_pass("cancelled");
        metrics.set_pending_moves(3);
        metrics.set_torrents_in_state("seeding", 12);
        metrics.set_transfer_rates(1_024, 2_048);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.evictions_total, 3);
        assert_eq!(snapshot.eviction_failures_total, 1);
        assert_eq!(snapshot.passes_completed, 1);
        assert_eq!(snapshot.passes_failed, 0);
        assert_eq!(snapshot.passes_cancelled, 1);
        assert_eq!(snapshot.pending_moves, 3);
        assert_eq!(snapshot.upload_bps, 1_024);
        assert_eq!(snapshot.download_bps, 2_048);

        let rendered = metrics.render()?;
        assert!(rendered.contains("seedr_evictions_total"));
        assert!(rendered.contains("seedr_torrents{state=\"seeding\"} 12"));
        Ok(())
    }

    #[test]
    fn separate_instances_do_not_share_state() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_pass("failed");
        assert_eq!(first.snapshot().passes_failed, 1);
        assert_eq!(second.snapshot(), MetricsSnapshot::default());
        Ok(())
    }
}
