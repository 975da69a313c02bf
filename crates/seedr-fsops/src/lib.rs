//! Disk usage probing and path containment helpers for storage tiers.
#![forbid(unsafe_code)]
#![warn(
    unused,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::debug;

pub mod error;

pub use error::{FsOpsError, FsOpsResult};

/// Capacity figures for the filesystem backing a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    /// Filesystem size in bytes.
    pub total_bytes: u64,
    /// Bytes in use.
    pub used_bytes: u64,
    /// Bytes available to unprivileged writers.
    pub free_bytes: u64,
}

impl DiskUsage {
    /// Share of usable capacity currently in use, in percent.
    ///
    /// Reserved blocks are excluded, so the value is `used / (used + free)`.
    #[must_use]
    pub fn used_percent(&self) -> f64 {
        let usable = self.used_bytes.saturating_add(self.free_bytes);
        if usable == 0 {
            return 0.0;
        }
        bytes_to_f64(self.used_bytes) / bytes_to_f64(usable) * 100.0
    }

    /// Usage after `bytes` have been released from the filesystem.
    #[must_use]
    pub const fn released(self, bytes: u64) -> Self {
        Self {
            total_bytes: self.total_bytes,
            used_bytes: self.used_bytes.saturating_sub(bytes),
            free_bytes: self.free_bytes.saturating_add(bytes),
        }
    }
}

/// Source of disk usage readings for a filesystem path.
pub trait DiskProbe: Send + Sync {
    /// Report usage for the filesystem containing `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the filesystem cannot be inspected.
    fn usage(&self, path: &Path) -> FsOpsResult<DiskUsage>;
}

/// [`DiskProbe`] backed by the `statvfs` syscall.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatvfsProbe;

impl DiskProbe for StatvfsProbe {
    fn usage(&self, path: &Path) -> FsOpsResult<DiskUsage> {
        let stat =
            nix::sys::statvfs::statvfs(path).map_err(|err| FsOpsError::statvfs(path, err))?;
        let fragment = u64::from(stat.fragment_size());
        let blocks = u64::from(stat.blocks());
        let blocks_free = u64::from(stat.blocks_free());
        let blocks_available = u64::from(stat.blocks_available());

        let usage = DiskUsage {
            total_bytes: blocks.saturating_mul(fragment),
            used_bytes: blocks.saturating_sub(blocks_free).saturating_mul(fragment),
            free_bytes: blocks_available.saturating_mul(fragment),
        };
        debug!(
            path = %path.display(),
            total_bytes = usage.total_bytes,
            used_bytes = usage.used_bytes,
            free_bytes = usage.free_bytes,
            "probed disk usage"
        );
        Ok(usage)
    }
}

/// Lexically normalise a path: drop `.` components and fold `..` into their parent.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Whether `path` lies inside (or is) `root`, compared component-wise.
///
/// `/data/tier` contains `/data/tier/show` but not `/data/tier2`.
#[must_use]
pub fn is_within(root: &Path, path: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}

/// Number of normal components in a path; used to rank overlapping roots.
#[must_use]
pub fn depth(path: &Path) -> usize {
    normalize(path)
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .count()
}

const fn bytes_to_f64(value: u64) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "percentages only need approximate byte counts"
    )]
    {
        value as f64
    }
}
