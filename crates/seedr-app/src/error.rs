//! # Design
//!
//! - Centralize application-level errors for bootstrap, scheduling and eviction passes.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: seedr_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: seedr_telemetry::TelemetryError,
    },
    /// Torrent client operations failed.
    #[error("torrent operation failed")]
    Torrent {
        /// Operation identifier.
        operation: &'static str,
        /// Source torrent error.
        source: seedr_torrent_core::TorrentError,
    },
    /// Disk usage for a tier could not be determined.
    #[error("disk probe failed")]
    Probe {
        /// Operation identifier.
        operation: &'static str,
        /// Tier root that was probed.
        path: PathBuf,
        /// Source probe error.
        source: seedr_fsops::FsOpsError,
    },
    /// No driver is registered under the configured name.
    #[error("unknown torrent driver")]
    UnknownDriver {
        /// Requested driver name.
        name: String,
    },
    /// A driver name was registered twice.
    #[error("duplicate torrent driver")]
    DuplicateDriver {
        /// Conflicting driver name.
        name: String,
    },
    /// Pending moves did not settle within the configured timeout.
    #[error("timed out waiting for torrent moves")]
    MoveTimeout {
        /// Hashes still reported as moving.
        pending: Vec<String>,
        /// Time spent waiting.
        waited: Duration,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: seedr_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: seedr_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn torrent(
        operation: &'static str,
        source: seedr_torrent_core::TorrentError,
    ) -> Self {
        Self::Torrent { operation, source }
    }

    pub(crate) const fn probe(
        operation: &'static str,
        path: PathBuf,
        source: seedr_fsops::FsOpsError,
    ) -> Self {
        Self::Probe {
            operation,
            path,
            source,
        }
    }

    pub(crate) const fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: None,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn app_error_helpers_build_variants() {
        let torrent = AppError::torrent(
            "list",
            seedr_torrent_core::TorrentError::UnknownTorrent {
                hash: "abc".to_string(),
            },
        );
        assert!(matches!(
            torrent,
            AppError::Torrent {
                operation: "list",
                ..
            }
        ));
        assert!(torrent.source().is_some());

        let probe = AppError::probe(
            "usage",
            PathBuf::from("/mnt/fast"),
            seedr_fsops::FsOpsError::InvalidInput {
                field: "path",
                reason: "missing",
                value: None,
            },
        );
        assert!(
            matches!(probe, AppError::Probe { ref path, .. } if path.as_path() == std::path::Path::new("/mnt/fast"))
        );

        let io = AppError::io("signal", io::Error::other("boom"));
        assert!(matches!(io, AppError::Io { path: None, .. }));
    }

    #[test]
    fn messages_stay_constant() {
        let err = AppError::MoveTimeout {
            pending: vec!["a".to_string()],
            waited: Duration::from_secs(3),
        };
        assert_eq!(err.to_string(), "timed out waiting for torrent moves");
        let err = AppError::UnknownDriver {
            name: "deluge".to_string(),
        };
        assert_eq!(err.to_string(), "unknown torrent driver");
    }
}
