//! WebUI response payloads and their mapping onto the shared torrent model.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use seedr_torrent_core::{Torrent, TorrentState, TransferStats};

/// Entry returned by `GET /api/v2/torrents/info`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TorrentInfo {
    /// Info hash (hex, lowercase).
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Directory the payload is stored under.
    pub save_path: String,
    /// Total size of selected files in bytes.
    pub size: i64,
    /// Share ratio.
    pub ratio: f64,
    /// Unix timestamp when the torrent was added.
    pub added_on: i64,
    /// Raw WebUI state string.
    pub state: String,
    /// Current tracker URL.
    pub tracker: String,
    /// Category assigned in the client.
    pub category: String,
    /// Upload rate in bytes per second.
    pub upspeed: i64,
    /// Download rate in bytes per second.
    pub dlspeed: i64,
    /// Bytes uploaded over the torrent's lifetime.
    pub uploaded: i64,
    /// Bytes downloaded over the torrent's lifetime.
    pub downloaded: i64,
    /// Connected seeds.
    pub num_seeds: i64,
    /// Connected leechers.
    pub num_leechs: i64,
}

/// Map a WebUI state string onto [`TorrentState`].
#[must_use]
pub fn map_state(state: &str) -> TorrentState {
    match state {
        "uploading" | "stalledUP" | "forcedUP" => TorrentState::Seeding,
        "downloading" | "stalledDL" | "forcedDL" | "metaDL" | "forcedMetaDL" => {
            TorrentState::Downloading
        }
        "pausedUP" | "pausedDL" | "stoppedUP" | "stoppedDL" => TorrentState::Paused,
        "queuedUP" | "queuedDL" => TorrentState::Queued,
        "checkingUP" | "checkingDL" | "checkingResumeData" => TorrentState::Checking,
        "allocating" => TorrentState::Allocating,
        "moving" => TorrentState::Moving,
        "error" | "missingFiles" => TorrentState::Error,
        _ => TorrentState::Unknown,
    }
}

impl From<TorrentInfo> for Torrent {
    fn from(info: TorrentInfo) -> Self {
        let state = map_state(&info.state);
        Self {
            hash: info.hash,
            name: info.name,
            download_location: info.save_path,
            size_bytes: non_negative(info.size),
            ratio: if info.ratio.is_finite() {
                info.ratio.max(0.0)
            } else {
                0.0
            },
            added_at: DateTime::<Utc>::from_timestamp(info.added_on, 0).unwrap_or_default(),
            state,
            tracker: non_empty(info.tracker),
            label: non_empty(info.category),
            transfer: TransferStats {
                upload_bps: non_negative(info.upspeed),
                download_bps: non_negative(info.dlspeed),
                uploaded_bytes: non_negative(info.uploaded),
                downloaded_bytes: non_negative(info.downloaded),
                seeds: u32::try_from(info.num_seeds).unwrap_or(0),
                peers: u32::try_from(info.num_leechs).unwrap_or(0),
            },
        }
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_strings_map_to_shared_states() {
        assert_eq!(map_state("stalledUP"), TorrentState::Seeding);
        assert_eq!(map_state("forcedMetaDL"), TorrentState::Downloading);
        assert_eq!(map_state("stoppedUP"), TorrentState::Paused);
        assert_eq!(map_state("queuedDL"), TorrentState::Queued);
        assert_eq!(map_state("checkingResumeData"), TorrentState::Checking);
        assert_eq!(map_state("allocating"), TorrentState::Allocating);
        assert_eq!(map_state("moving"), TorrentState::Moving);
        assert_eq!(map_state("missingFiles"), TorrentState::Error);
        assert_eq!(map_state("somethingNew"), TorrentState::Unknown);
    }

    #[test]
    fn torrent_info_converts_with_defaults() -> Result<(), serde_json::Error> {
        let info: TorrentInfo = serde_json::from_str(
            r#"{
                "hash": "abc",
                "name": "ubuntu.iso",
                "save_path": "/mnt/fast",
                "size": 4096,
                "ratio": 1.25,
                "added_on": 1700000000,
                "state": "uploading",
                "tracker": "",
                "category": "linux",
                "upspeed": 512,
                "dlspeed": -1,
                "extra_field": true
            }"#,
        )?;
        let torrent = Torrent::from(info);
        assert_eq!(torrent.download_location, "/mnt/fast");
        assert_eq!(torrent.size_bytes, 4_096);
        assert_eq!(torrent.state, TorrentState::Seeding);
        assert_eq!(torrent.added_at.timestamp(), 1_700_000_000);
        assert_eq!(torrent.tracker, None);
        assert_eq!(torrent.label.as_deref(), Some("linux"));
        assert_eq!(torrent.transfer.upload_bps, 512);
        assert_eq!(torrent.transfer.download_bps, 0);
        Ok(())
    }
}
