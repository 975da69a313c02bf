//! Builders for torrents and disk readings.

use chrono::{DateTime, Utc};
use seedr_fsops::DiskUsage;
use seedr_torrent_core::{Torrent, TorrentState, TransferStats};

/// Seeding torrent stored under `location`, added `added_secs` after the epoch.
#[must_use]
pub fn torrent(hash: &str, location: &str, size_bytes: u64, ratio: f64, added_secs: i64) -> Torrent {
    Torrent {
        hash: hash.to_string(),
        name: format!("{hash}.payload"),
        download_location: location.to_string(),
        size_bytes,
        ratio,
        added_at: DateTime::<Utc>::from_timestamp(added_secs, 0).unwrap_or_default(),
        state: TorrentState::Seeding,
        tracker: None,
        label: None,
        transfer: TransferStats::default(),
    }
}

/// Disk reading with the given free and used byte counts.
#[must_use]
pub const fn disk(free_bytes: u64, used_bytes: u64) -> DiskUsage {
    DiskUsage {
        total_bytes: free_bytes.saturating_add(used_bytes),
        used_bytes,
        free_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torrent_fixture_is_seeding() {
        let fixture = torrent("abc", "/mnt/fast", 10, 1.5, 100);
        assert_eq!(fixture.state, TorrentState::Seeding);
        assert_eq!(fixture.added_at.timestamp(), 100);
        assert_eq!(fixture.download_location, "/mnt/fast");
    }

    #[test]
    fn disk_fixture_sums_total() {
        let usage = disk(40, 60);
        assert_eq!(usage.total_bytes, 100);
        assert!((usage.used_percent() - 60.0).abs() < f64::EPSILON);
    }
}
