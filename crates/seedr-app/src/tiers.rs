//! Priority-ordered storage tiers and path-to-tier resolution.

use std::path::{Path, PathBuf};

use seedr_config::{SpaceThreshold, TierConfig};
use seedr_fsops::{DiskUsage, depth, is_within};

/// A storage tier as seen by the eviction engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    /// Root directory of the tier.
    pub path: PathBuf,
    /// Higher values are visited first.
    pub priority: i32,
    /// Space pressure thresholds.
    pub space: SpaceThreshold,
    /// Ratio ceiling; negative disables the ratio rule.
    pub max_ratio: f64,
}

impl Tier {
    /// Whether `usage` breaches either configured space threshold.
    ///
    /// A tier without thresholds never reports pressure.
    #[must_use]
    pub fn space_pressure(&self, usage: &DiskUsage) -> bool {
        let below_free = self
            .space
            .min_free_bytes
            .is_some_and(|min_free| usage.free_bytes < min_free);
        let above_used = self
            .space
            .max_used_percent
            .is_some_and(|max_used| usage.used_percent() > max_used);
        below_free || above_used
    }

    /// Ratio ceiling when the ratio rule is enabled.
    #[must_use]
    pub fn ratio_limit(&self) -> Option<f64> {
        (self.max_ratio >= 0.0).then_some(self.max_ratio)
    }

    /// Tier root rendered as a client-side destination directory.
    #[must_use]
    pub fn destination(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

impl From<&TierConfig> for Tier {
    fn from(config: &TierConfig) -> Self {
        Self {
            path: config.path.clone(),
            priority: config.priority,
            space: config.space,
            max_ratio: config.max_ratio,
        }
    }
}

/// What evicting a torrent from a tier means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvictionTarget<'a> {
    /// Relocate into the next lower-priority tier.
    Move(&'a Tier),
    /// Remove the torrent and its data; only on the last tier.
    Delete,
}

/// Tiers sorted by descending priority; equal priorities keep configuration order.
#[derive(Debug, Clone, Default)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    /// Build the table from validated configuration.
    #[must_use]
    pub fn new(configs: &[TierConfig]) -> Self {
        let mut tiers: Vec<Tier> = configs.iter().map(Tier::from).collect();
        tiers.sort_by(|left, right| right.priority.cmp(&left.priority));
        Self { tiers }
    }

    /// Tiers in evaluation order.
    #[must_use]
    pub fn tiers_by_priority(&self) -> &[Tier] {
        &self.tiers
    }

    /// Number of tiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Whether no tiers are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Whether `index` is the lowest-priority tier.
    #[must_use]
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.tiers.len()
    }

    /// Eviction action for torrents leaving the tier at `index`.
    #[must_use]
    pub fn eviction_target(&self, index: usize) -> EvictionTarget<'_> {
        self.tiers
            .get(index + 1)
            .map_or(EvictionTarget::Delete, EvictionTarget::Move)
    }

    /// Index of the tier whose root contains `location`.
    ///
    /// Overlapping roots are a configuration error; when they occur anyway the
    /// deepest matching root wins.
    #[must_use]
    pub fn tier_for_path(&self, location: &str) -> Option<usize> {
        let location = Path::new(location);
        self.tiers
            .iter()
            .enumerate()
            .filter(|(_, tier)| is_within(&tier.path, location))
            .max_by_key(|(index, tier)| (depth(&tier.path), std::cmp::Reverse(*index)))
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedr_test_support::disk;

    fn tier(path: &str, priority: i32) -> TierConfig {
        TierConfig {
            path: PathBuf::from(path),
            priority,
            ..TierConfig::default()
        }
    }

    #[test]
    fn tiers_sort_by_priority_with_stable_ties() {
        let table = TierTable::new(&[
            tier("/slow", 0),
            tier("/fast", 10),
            tier("/warm-a", 5),
            tier("/warm-b", 5),
        ]);
        let order: Vec<_> = table
            .tiers_by_priority()
            .iter()
            .map(|tier| tier.path.to_string_lossy().into_owned())
            .collect();
        assert_eq!(order, ["/fast", "/warm-a", "/warm-b", "/slow"]);
        assert!(table.is_last(3));
        assert!(!table.is_last(0));
    }

    #[test]
    fn eviction_target_moves_down_until_last_tier() {
        let table = TierTable::new(&[tier("/fast", 1), tier("/slow", 0)]);
        match table.eviction_target(0) {
            EvictionTarget::Move(next) => assert_eq!(next.path, PathBuf::from("/slow")),
            EvictionTarget::Delete => panic!("first tier must move"),
        }
        assert_eq!(table.eviction_target(1), EvictionTarget::Delete);
    }

    #[test]
    fn tier_for_path_uses_component_prefixes() {
        let table = TierTable::new(&[
            tier("/data/tier", 2),
            tier("/data/tier2", 1),
            tier("/data/tier/nested", 0),
        ]);
        assert_eq!(table.tier_for_path("/data/tier/show"), Some(0));
        assert_eq!(table.tier_for_path("/data/tier2/movie"), Some(1));
        assert_eq!(table.tier_for_path("/data/tier/nested/x"), Some(2));
        assert_eq!(table.tier_for_path("/elsewhere"), None);
    }

    #[test]
    fn space_pressure_checks_both_thresholds() {
        let mut fast = Tier::from(&tier("/fast", 0));
        assert!(!fast.space_pressure(&disk(0, 100)));

        fast.space.min_free_bytes = Some(100);
        assert!(fast.space_pressure(&disk(50, 50)));
        assert!(!fast.space_pressure(&disk(100, 50)));

        fast.space = SpaceThreshold {
            min_free_bytes: None,
            max_used_percent: Some(80.0),
        };
        assert!(fast.space_pressure(&disk(10, 90)));
        assert!(!fast.space_pressure(&disk(20, 80)));
    }

    #[test]
    fn negative_ratio_disables_rule() {
        let mut fast = Tier::from(&tier("/fast", 0));
        assert_eq!(fast.ratio_limit(), None);
        fast.max_ratio = 0.0;
        assert_eq!(fast.ratio_limit(), Some(0.0));
    }
}
