//! Outcome of one eviction pass.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Rule that selected a torrent for eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionRule {
    /// Tier breached a space threshold.
    Space,
    /// Torrent exceeded the tier's ratio ceiling.
    Ratio,
}

impl EvictionRule {
    /// Metric and log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Space => "space",
            Self::Ratio => "ratio",
        }
    }
}

impl fmt::Display for EvictionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action taken against an evicted torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionAction {
    /// Relocated to the next tier.
    Move,
    /// Removed together with its data.
    Delete,
}

impl EvictionAction {
    /// Metric and log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for EvictionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One eviction decision, applied or attempted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Eviction {
    /// Torrent hash.
    pub hash: String,
    /// Rule that selected the torrent.
    pub rule: EvictionRule,
    /// Move or delete.
    pub action: EvictionAction,
    /// Destination tier root for moves.
    pub destination: Option<PathBuf>,
    /// Payload size in bytes.
    pub size_bytes: u64,
}

/// Per-tier summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierReport {
    /// Tier root.
    pub path: PathBuf,
    /// Whether the space rule fired.
    pub space_pressure: bool,
    /// Evictions that succeeded (or would have, in dry-run mode).
    pub evictions: Vec<Eviction>,
    /// Evictions the client rejected.
    pub failures: Vec<Eviction>,
}

impl TierReport {
    pub(crate) const fn new(path: PathBuf) -> Self {
        Self {
            path,
            space_pressure: false,
            evictions: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Hashes successfully moved out of the tier.
    #[must_use]
    pub fn moved(&self) -> Vec<&str> {
        self.hashes_for(EvictionAction::Move)
    }

    /// Hashes deleted from the tier.
    #[must_use]
    pub fn deleted(&self) -> Vec<&str> {
        self.hashes_for(EvictionAction::Delete)
    }

    /// Hashes whose eviction failed.
    #[must_use]
    pub fn failed(&self) -> Vec<&str> {
        self.failures.iter().map(|eviction| eviction.hash.as_str()).collect()
    }

    fn hashes_for(&self, action: EvictionAction) -> Vec<&str> {
        self.evictions
            .iter()
            .filter(|eviction| eviction.action == action)
            .map(|eviction| eviction.hash.as_str())
            .collect()
    }
}

/// Summary of a full eviction pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassReport {
    /// Tiers visited, in evaluation order.
    pub tiers: Vec<TierReport>,
    /// Whether actions were logged instead of issued.
    pub dry_run: bool,
    /// Whether cancellation cut the pass short.
    pub cancelled: bool,
}

impl PassReport {
    pub(crate) fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Total successful evictions across tiers.
    #[must_use]
    pub fn eviction_count(&self) -> usize {
        self.tiers.iter().map(|tier| tier.evictions.len()).sum()
    }

    /// Total failed evictions across tiers.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tiers.iter().map(|tier| tier.failures.len()).sum()
    }

    /// Every successful eviction in pass order.
    pub fn evictions(&self) -> impl Iterator<Item = &Eviction> {
        self.tiers.iter().flat_map(|tier| tier.evictions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eviction(hash: &str, action: EvictionAction) -> Eviction {
        Eviction {
            hash: hash.to_string(),
            rule: EvictionRule::Space,
            action,
            destination: None,
            size_bytes: 1,
        }
    }

    #[test]
    fn tier_report_splits_actions() {
        let mut tier = TierReport::new(PathBuf::from("/fast"));
        tier.evictions.push(eviction("a", EvictionAction::Move));
        tier.evictions.push(eviction("b", EvictionAction::Delete));
        tier.failures.push(eviction("c", EvictionAction::Move));

        assert_eq!(tier.moved(), ["a"]);
        assert_eq!(tier.deleted(), ["b"]);
        assert_eq!(tier.failed(), ["c"]);

        let report = PassReport {
            tiers: vec![tier],
            ..PassReport::new(false)
        };
        assert_eq!(report.eviction_count(), 2);
        assert_eq!(report.failure_count(), 1);
    }

    #[test]
    fn labels_match_metric_values() {
        assert_eq!(EvictionRule::Ratio.to_string(), "ratio");
        assert_eq!(EvictionAction::Delete.as_str(), "delete");
    }
}
