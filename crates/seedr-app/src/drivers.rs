//! Torrent driver registry keyed by configured driver name.

use std::collections::BTreeMap;
use std::sync::Arc;

use seedr_config::ClientConfig;
use seedr_qbittorrent::{DRIVER_NAME as QBITTORRENT, QBittorrentDriver};
use seedr_torrent_core::TorrentDriver;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Builds a driver from the `client:` configuration section.
pub trait DriverFactory: Send + Sync {
    /// Create a driver instance; no connection is made yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration cannot be used by this driver.
    fn create(&self, config: &ClientConfig) -> AppResult<Arc<dyn TorrentDriver>>;
}

impl<F> DriverFactory for F
where
    F: Fn(&ClientConfig) -> AppResult<Arc<dyn TorrentDriver>> + Send + Sync,
{
    fn create(&self, config: &ClientConfig) -> AppResult<Arc<dyn TorrentDriver>> {
        self(config)
    }
}

/// Factory for the qBittorrent WebUI driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct QBittorrentFactory;

impl DriverFactory for QBittorrentFactory {
    fn create(&self, config: &ClientConfig) -> AppResult<Arc<dyn TorrentDriver>> {
        Ok(Arc::new(QBittorrentDriver::new(
            config.base_url(),
            config.username.clone(),
            config.password.clone(),
        )))
    }
}

/// Named driver factories.
pub struct DriverRegistry {
    factories: BTreeMap<String, Arc<dyn DriverFactory>>,
}

impl DriverRegistry {
    /// Registry without any drivers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register `factory` under `name` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::DuplicateDriver`] when the name is taken.
    pub fn register(
        &mut self,
        name: &str,
        factory: impl DriverFactory + 'static,
    ) -> AppResult<()> {
        let key = name.to_ascii_lowercase();
        if self.factories.contains_key(&key) {
            return Err(AppError::DuplicateDriver { name: key });
        }
        self.factories.insert(key, Arc::new(factory));
        Ok(())
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the driver selected by `config.driver`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnknownDriver`] for unregistered names, or the
    /// factory's own error.
    pub fn create(&self, config: &ClientConfig) -> AppResult<Arc<dyn TorrentDriver>> {
        let key = config.driver.to_ascii_lowercase();
        let factory = self
            .factories
            .get(&key)
            .ok_or(AppError::UnknownDriver { name: key })?;
        debug!(driver = %config.driver, base_url = %config.base_url(), "creating torrent driver");
        factory.create(config)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        let mut factories: BTreeMap<String, Arc<dyn DriverFactory>> = BTreeMap::new();
        factories.insert(QBITTORRENT.to_string(), Arc::new(QBittorrentFactory));
        Self { factories }
    }
}
