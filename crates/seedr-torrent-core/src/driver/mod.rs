//! Capability trait implemented by torrent client adapters.

use async_trait::async_trait;

use crate::error::{TorrentError, TorrentResult};
use crate::model::{StateFilter, Torrent};

/// Primary driver trait implemented by client adapters (e.g. qBittorrent).
///
/// Implementations are not required to tolerate concurrent calls; callers
/// share a driver through [`crate::ConnectionGuard`].
#[async_trait]
pub trait TorrentDriver: Send + Sync {
    /// Stable identifier of the adapter (the registry key).
    fn name(&self) -> &'static str;

    /// Establish the session with the remote client.
    async fn connect(&self) -> TorrentResult<()>;

    /// List torrents whose state passes `filter`.
    async fn list_torrents(&self, filter: &StateFilter) -> TorrentResult<Vec<Torrent>>;

    /// Relocate a torrent's storage to `destination`.
    async fn move_torrent(&self, hash: &str, destination: &str) -> TorrentResult<()>;

    /// Remove a torrent, optionally deleting its payload.
    async fn remove_torrent(&self, hash: &str, delete_data: bool) -> TorrentResult<()>;

    /// Fetch the current status of a single torrent.
    ///
    /// Returns [`TorrentError::UnknownTorrent`] when the client no longer knows it.
    async fn torrent(&self, hash: &str) -> TorrentResult<Torrent>;

    /// Report the client version; default implementation reports lack of support.
    async fn client_version(&self) -> TorrentResult<String> {
        Err(TorrentError::Unsupported {
            operation: "client_version",
        })
    }

    /// Tear down the session; the default is a no-op.
    async fn close(&self) -> TorrentResult<()> {
        Ok(())
    }
}
