//! [`TorrentDriver`] implementation backed by the qBittorrent WebUI.

use async_trait::async_trait;
use seedr_torrent_core::{StateFilter, Torrent, TorrentDriver, TorrentError, TorrentResult};
use tracing::{debug, info};

use crate::client::QBittorrentClient;
use crate::error::QBittorrentError;

/// Registry key of the qBittorrent driver.
pub const DRIVER_NAME: &str = "qbittorrent";

/// qBittorrent adapter.
pub struct QBittorrentDriver {
    client: QBittorrentClient,
}

impl QBittorrentDriver {
    /// Build a driver for the WebUI at `base_url` using the given credentials.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::from_client(QBittorrentClient::new(base_url).with_credentials(username, password))
    }

    /// Wrap an already configured client.
    #[must_use]
    pub const fn from_client(client: QBittorrentClient) -> Self {
        Self { client }
    }
}

fn map_error(operation: &'static str, hash: Option<&str>, err: QBittorrentError) -> TorrentError {
    match err {
        QBittorrentError::Auth { detail } => TorrentError::Authentication { detail },
        other => TorrentError::driver(operation, hash, other),
    }
}

#[async_trait]
impl TorrentDriver for QBittorrentDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    async fn connect(&self) -> TorrentResult<()> {
        self.client
            .login()
            .await
            .map_err(|err| map_error("connect", None, err))?;
        info!(url = %self.client.base_url(), "connected to qbittorrent");
        Ok(())
    }

    async fn list_torrents(&self, filter: &StateFilter) -> TorrentResult<Vec<Torrent>> {
        let infos = self
            .client
            .torrents_info(None)
            .await
            .map_err(|err| map_error("list_torrents", None, err))?;
        let torrents: Vec<Torrent> = infos
            .into_iter()
            .map(Torrent::from)
            .filter(|torrent| filter.matches(torrent.state))
            .collect();
        debug!(count = torrents.len(), "listed qbittorrent torrents");
        Ok(torrents)
    }

    async fn move_torrent(&self, hash: &str, destination: &str) -> TorrentResult<()> {
        self.client
            .set_location(&[hash], destination)
            .await
            .map_err(|err| map_error("move_torrent", Some(hash), err))
    }

    async fn remove_torrent(&self, hash: &str, delete_data: bool) -> TorrentResult<()> {
        self.client
            .delete(&[hash], delete_data)
            .await
            .map_err(|err| map_error("remove_torrent", Some(hash), err))
    }

    async fn torrent(&self, hash: &str) -> TorrentResult<Torrent> {
        let infos = self
            .client
            .torrents_info(Some(&[hash][..]))
            .await
            .map_err(|err| map_error("torrent", Some(hash), err))?;
        infos
            .into_iter()
            .find(|info| info.hash.eq_ignore_ascii_case(hash))
            .map(Torrent::from)
            .ok_or_else(|| TorrentError::UnknownTorrent {
                hash: hash.to_string(),
            })
    }

    async fn client_version(&self) -> TorrentResult<String> {
        self.client
            .app_version()
            .await
            .map_err(|err| map_error("client_version", None, err))
    }

    async fn close(&self) -> TorrentResult<()> {
        if self.client.sid().await.is_none() {
            return Ok(());
        }
        self.client
            .logout()
            .await
            .map_err(|err| map_error("close", None, err))
    }
}
