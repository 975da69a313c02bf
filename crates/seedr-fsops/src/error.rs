//! # Design
//!
//! - Provide structured, constant-message errors for disk probing.
//! - Capture the probed path so failures are reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced while inspecting storage tiers.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// The `statvfs` syscall failed.
    #[error("fsops statvfs failure")]
    Statvfs {
        /// Path that was probed.
        path: PathBuf,
        /// Underlying nix error.
        source: nix::Error,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl FsOpsError {
    pub(crate) fn statvfs(path: impl Into<PathBuf>, source: nix::Error) -> Self {
        Self::Statvfs {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn fsops_error_helpers_build_variants() {
        let err = FsOpsError::statvfs("/missing", nix::Error::ENOENT);
        assert!(matches!(err, FsOpsError::Statvfs { .. }));
        assert_eq!(err.to_string(), "fsops statvfs failure");
        assert!(err.source().is_some());

        let invalid = FsOpsError::InvalidInput {
            field: "path",
            reason: "empty",
            value: None,
        };
        assert!(invalid.source().is_none());
    }
}
