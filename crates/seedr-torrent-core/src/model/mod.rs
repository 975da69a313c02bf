//! Core torrent domain types shared across the workspace.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the remote torrent client.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Client reported a state we could not map.
    #[default]
    Unknown,
    /// Torrent is active without a more specific state.
    Active,
    /// Storage is being allocated.
    Allocating,
    /// Data is being hash-checked.
    Checking,
    /// Torrent is downloading.
    Downloading,
    /// Torrent is complete and seeding.
    Seeding,
    /// Torrent is paused or stopped.
    Paused,
    /// Client reported an error for the torrent.
    Error,
    /// Torrent is waiting in the client queue.
    Queued,
    /// Storage is being relocated.
    Moving,
}

impl TorrentState {
    /// Every concrete state, in reporting order.
    pub const ALL: [Self; 10] = [
        Self::Unknown,
        Self::Active,
        Self::Allocating,
        Self::Checking,
        Self::Downloading,
        Self::Seeding,
        Self::Paused,
        Self::Error,
        Self::Queued,
        Self::Moving,
    ];

    /// Stable machine-friendly label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Active => "active",
            Self::Allocating => "allocating",
            Self::Checking => "checking",
            Self::Downloading => "downloading",
            Self::Seeding => "seeding",
            Self::Paused => "paused",
            Self::Error => "error",
            Self::Queued => "queued",
            Self::Moving => "moving",
        }
    }
}

impl Display for TorrentState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Selects which torrents a listing call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFilter {
    /// Every torrent regardless of state.
    Any,
    /// Only torrents whose state is in the set.
    Only(BTreeSet<TorrentState>),
}

impl StateFilter {
    /// Build a filter matching the supplied states.
    #[must_use]
    pub fn only(states: impl IntoIterator<Item = TorrentState>) -> Self {
        Self::Only(states.into_iter().collect())
    }

    /// Whether a torrent in `state` passes the filter.
    #[must_use]
    pub fn matches(&self, state: TorrentState) -> bool {
        match self {
            Self::Any => true,
            Self::Only(states) => states.contains(&state),
        }
    }
}

/// Transfer counters reported alongside a torrent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    /// Current upload rate in bytes per second.
    pub upload_bps: u64,
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    /// Total payload bytes uploaded.
    pub uploaded_bytes: u64,
    /// Total payload bytes downloaded.
    pub downloaded_bytes: u64,
    /// Connected seeds.
    pub seeds: u32,
    /// Connected peers.
    pub peers: u32,
}

/// Point-in-time view of a single torrent as reported by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Torrent {
    /// Info hash; unique within one listing.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Directory the client stores the payload under.
    pub download_location: String,
    /// Total payload size in bytes.
    pub size_bytes: u64,
    /// Share ratio (uploaded / downloaded); zero or negative before any transfer.
    pub ratio: f64,
    /// When the torrent was admitted into the client.
    pub added_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: TorrentState,
    /// Primary tracker URL when the client reports one.
    #[serde(default)]
    pub tracker: Option<String>,
    /// Client-side label or category.
    #[serde(default)]
    pub label: Option<String>,
    /// Transfer counters.
    #[serde(default)]
    pub transfer: TransferStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_filter_matches_selected_states_only() {
        let filter = StateFilter::only([TorrentState::Seeding, TorrentState::Paused]);
        assert!(filter.matches(TorrentState::Seeding));
        assert!(filter.matches(TorrentState::Paused));
        assert!(!filter.matches(TorrentState::Moving));
        assert!(StateFilter::Any.matches(TorrentState::Moving));
    }

    #[test]
    fn state_labels_are_stable() {
        let labels: Vec<_> = TorrentState::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(labels[0], "unknown");
        assert_eq!(labels[5], "seeding");
        assert_eq!(labels[9], "moving");
    }
}
