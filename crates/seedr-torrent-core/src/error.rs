//! Error types for torrent driver operations.

use std::error::Error;

use thiserror::Error;

/// Primary error type for torrent driver operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// Operation is not supported by the underlying client.
    #[error("torrent operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Remote call failed.
    #[error("torrent driver call failed")]
    Driver {
        /// Operation identifier.
        operation: &'static str,
        /// Torrent hash when the call targeted a single torrent.
        hash: Option<String>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The client does not know the torrent.
    #[error("unknown torrent")]
    UnknownTorrent {
        /// Missing torrent hash.
        hash: String,
    },
    /// The client rejected our credentials.
    #[error("torrent client authentication failed")]
    Authentication {
        /// Detail reported by the client.
        detail: String,
    },
}

impl TorrentError {
    /// Wrap an arbitrary failure raised while calling the client.
    pub fn driver(
        operation: &'static str,
        hash: Option<&str>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Driver {
            operation,
            hash: hash.map(str::to_owned),
            source: source.into(),
        }
    }

    /// Whether the error reports that the torrent no longer exists.
    #[must_use]
    pub const fn is_unknown_torrent(&self) -> bool {
        matches!(self, Self::UnknownTorrent { .. })
    }
}

/// Convenience alias for torrent operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;
