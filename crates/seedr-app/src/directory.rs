//! Pass-local snapshot of eligible torrents.
//!
//! The listing is taken once per pass and never refreshed; torrents evicted
//! during the pass are only tracked so later rules skip them.

use std::collections::HashSet;

use seedr_torrent_core::{ConnectionGuard, StateFilter, Torrent, TorrentResult, TorrentState};
use tracing::{debug, warn};

use crate::tiers::TierTable;

/// States whose torrents are subject to eviction.
pub const ELIGIBLE_STATES: [TorrentState; 3] = [
    TorrentState::Active,
    TorrentState::Seeding,
    TorrentState::Paused,
];

/// Immutable torrent listing plus the set of hashes already evicted this pass.
#[derive(Debug, Clone, Default)]
pub struct TorrentDirectory {
    torrents: Vec<Torrent>,
    evicted: HashSet<String>,
}

impl TorrentDirectory {
    /// Filter matching [`ELIGIBLE_STATES`].
    #[must_use]
    pub fn eligible_filter() -> StateFilter {
        StateFilter::only(ELIGIBLE_STATES)
    }

    /// List torrents matching `filter` through the connection guard.
    ///
    /// # Errors
    ///
    /// Returns the driver error when the listing fails; an empty listing is not an error.
    pub async fn snapshot(guard: &ConnectionGuard, filter: &StateFilter) -> TorrentResult<Self> {
        let torrents = guard.list_torrents(filter).await?;
        debug!(torrents = torrents.len(), "listed torrents");
        Ok(Self::from_torrents(torrents))
    }

    /// Directory over an existing listing; later duplicates of a hash are dropped.
    #[must_use]
    pub fn from_torrents(torrents: Vec<Torrent>) -> Self {
        let mut seen = HashSet::with_capacity(torrents.len());
        let torrents = torrents
            .into_iter()
            .filter(|torrent| {
                let fresh = seen.insert(torrent.hash.clone());
                if !fresh {
                    warn!(hash = %torrent.hash, "client listed torrent twice; ignoring duplicate");
                }
                fresh
            })
            .collect();
        Self {
            torrents,
            evicted: HashSet::new(),
        }
    }

    /// Number of listed torrents, evicted or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.torrents.len()
    }

    /// Whether the listing was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.torrents.is_empty()
    }

    /// Record that `hash` left its tier during this pass.
    pub fn mark_evicted(&mut self, hash: &str) {
        self.evicted.insert(hash.to_string());
    }

    /// Whether `hash` was evicted earlier in this pass.
    #[must_use]
    pub fn is_evicted(&self, hash: &str) -> bool {
        self.evicted.contains(hash)
    }

    /// Space-rule candidates of tier `index`, oldest first.
    #[must_use]
    pub fn space_candidates(&self, tiers: &TierTable, index: usize) -> Vec<Torrent> {
        let mut candidates = self.resident(tiers, index);
        candidates.sort_by(|left, right| {
            left.added_at
                .cmp(&right.added_at)
                .then_with(|| left.hash.cmp(&right.hash))
        });
        candidates
    }

    /// Ratio-rule candidates of tier `index`, highest ratio first.
    #[must_use]
    pub fn ratio_candidates(&self, tiers: &TierTable, index: usize) -> Vec<Torrent> {
        let mut candidates = self.resident(tiers, index);
        candidates.sort_by(|left, right| {
            right
                .ratio
                .total_cmp(&left.ratio)
                .then_with(|| left.hash.cmp(&right.hash))
        });
        candidates
    }

    fn resident(&self, tiers: &TierTable, index: usize) -> Vec<Torrent> {
        self.torrents
            .iter()
            .filter(|torrent| !self.evicted.contains(&torrent.hash))
            .filter(|torrent| tiers.tier_for_path(&torrent.download_location) == Some(index))
            .cloned()
            .collect()
    }
}
