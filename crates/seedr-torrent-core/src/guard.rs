//! Serialised access to a torrent driver connection.
//!
//! # Design
//! - Remote clients are not safe for concurrent requests, so every call goes
//!   through one async mutex.
//! - The lock is held for a single driver call only; callers that wait between
//!   calls (move-completion polling) never hold it while sleeping.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

use crate::driver::TorrentDriver;
use crate::error::TorrentResult;
use crate::model::{StateFilter, Torrent};

/// Cloneable handle that serialises calls into a shared [`TorrentDriver`].
#[derive(Clone)]
pub struct ConnectionGuard {
    inner: Arc<GuardInner>,
}

struct GuardInner {
    driver: Arc<dyn TorrentDriver>,
    lock: Mutex<()>,
}

impl ConnectionGuard {
    /// Wrap a driver so that all calls are serialised.
    #[must_use]
    pub fn new(driver: Arc<dyn TorrentDriver>) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                driver,
                lock: Mutex::new(()),
            }),
        }
    }

    /// Name of the wrapped driver.
    #[must_use]
    pub fn driver_name(&self) -> &'static str {
        self.inner.driver.name()
    }

    async fn acquire(&self, operation: &'static str) -> MutexGuard<'_, ()> {
        if let Ok(permit) = self.inner.lock.try_lock() {
            return permit;
        }
        trace!(operation, "waiting for torrent client connection");
        self.inner.lock.lock().await
    }

    /// Establish the remote session.
    ///
    /// # Errors
    ///
    /// Propagates the driver's connection failure.
    pub async fn connect(&self) -> TorrentResult<()> {
        let _permit = self.acquire("connect").await;
        self.inner.driver.connect().await
    }

    /// List torrents matching `filter`.
    ///
    /// # Errors
    ///
    /// Propagates the driver's listing failure.
    pub async fn list_torrents(&self, filter: &StateFilter) -> TorrentResult<Vec<Torrent>> {
        let _permit = self.acquire("list_torrents").await;
        self.inner.driver.list_torrents(filter).await
    }

    /// Relocate a torrent's storage.
    ///
    /// # Errors
    ///
    /// Propagates the driver's move failure.
    pub async fn move_torrent(&self, hash: &str, destination: &str) -> TorrentResult<()> {
        let _permit = self.acquire("move_torrent").await;
        self.inner.driver.move_torrent(hash, destination).await
    }

    /// Remove a torrent, optionally with its data.
    ///
    /// # Errors
    ///
    /// Propagates the driver's removal failure.
    pub async fn remove_torrent(&self, hash: &str, delete_data: bool) -> TorrentResult<()> {
        let _permit = self.acquire("remove_torrent").await;
        self.inner.driver.remove_torrent(hash, delete_data).await
    }

    /// Fetch a single torrent's status.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTorrent` when the client no longer knows the hash, or the
    /// driver's failure otherwise.
    pub async fn torrent(&self, hash: &str) -> TorrentResult<Torrent> {
        let _permit = self.acquire("torrent").await;
        self.inner.driver.torrent(hash).await
    }

    /// Report the remote client version.
    ///
    /// # Errors
    ///
    /// Propagates the driver's failure or lack of support.
    pub async fn client_version(&self) -> TorrentResult<String> {
        let _permit = self.acquire("client_version").await;
        self.inner.driver.client_version().await
    }

    /// Tear down the remote session.
    ///
    /// # Errors
    ///
    /// Propagates the driver's close failure.
    pub async fn close(&self) -> TorrentResult<()> {
        let _permit = self.acquire("close").await;
        self.inner.driver.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TorrentError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct OverlapDetector {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    impl OverlapDetector {
        async fn enter(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TorrentDriver for OverlapDetector {
        fn name(&self) -> &'static str {
            "overlap"
        }

        async fn connect(&self) -> TorrentResult<()> {
            self.enter().await;
            Ok(())
        }

        async fn list_torrents(&self, _filter: &StateFilter) -> TorrentResult<Vec<Torrent>> {
            self.enter().await;
            Ok(Vec::new())
        }

        async fn move_torrent(&self, _hash: &str, _destination: &str) -> TorrentResult<()> {
            self.enter().await;
            Ok(())
        }

        async fn remove_torrent(&self, _hash: &str, _delete_data: bool) -> TorrentResult<()> {
            self.enter().await;
            Ok(())
        }

        async fn torrent(&self, hash: &str) -> TorrentResult<Torrent> {
            self.enter().await;
            Err(TorrentError::UnknownTorrent {
                hash: hash.to_owned(),
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_never_overlap() -> anyhow::Result<()> {
        let detector = Arc::new(OverlapDetector::default());
        let guard = ConnectionGuard::new(detector.clone());

        let mut handles = Vec::new();
        for index in 0..16 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move {
                match index % 4 {
                    0 => guard.list_torrents(&StateFilter::Any).await.map(|_| ()),
                    1 => guard.move_torrent("abc", "/mnt/next").await,
                    2 => guard.remove_torrent("abc", true).await,
                    _ => match guard.torrent("abc").await {
                        Err(err) if err.is_unknown_torrent() => Ok(()),
                        other => other.map(|_| ()),
                    },
                }
            }));
        }
        for handle in handles {
            handle.await??;
        }

        assert_eq!(detector.calls.load(Ordering::SeqCst), 16);
        assert_eq!(detector.max_in_flight.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn guard_forwards_optional_capabilities() {
        let guard = ConnectionGuard::new(Arc::new(OverlapDetector::default()));
        assert_eq!(guard.driver_name(), "overlap");
        assert!(guard.connect().await.is_ok());
        assert!(guard.client_version().await.is_err());
        assert!(guard.close().await.is_ok());
    }
}
