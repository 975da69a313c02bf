//! Scriptable disk probe keyed by tier path.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use seedr_fsops::{DiskProbe, DiskUsage, FsOpsError, FsOpsResult};

#[derive(Default)]
struct ProbeState {
    usage: HashMap<PathBuf, DiskUsage>,
    failing: HashSet<PathBuf>,
    probed: Vec<PathBuf>,
}

/// [`DiskProbe`] returning canned readings; unknown paths fail.
#[derive(Default)]
pub struct FakeProbe {
    state: Mutex<ProbeState>,
}

impl FakeProbe {
    /// Probe with no readings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a reading for `path`.
    #[must_use]
    pub fn with_usage(self, path: impl Into<PathBuf>, usage: DiskUsage) -> Self {
        self.set_usage(path, usage);
        self
    }

    /// Replace the reading for `path`.
    pub fn set_usage(&self, path: impl Into<PathBuf>, usage: DiskUsage) {
        self.lock().usage.insert(path.into(), usage);
    }

    /// Make probes of `path` fail.
    pub fn fail_path(&self, path: impl Into<PathBuf>) {
        self.lock().failing.insert(path.into());
    }

    /// Paths probed so far, in order.
    #[must_use]
    pub fn probed(&self) -> Vec<PathBuf> {
        self.lock().probed.clone()
    }
}

impl DiskProbe for FakeProbe {
    fn usage(&self, path: &Path) -> FsOpsResult<DiskUsage> {
        let mut state = self.lock();
        state.probed.push(path.to_path_buf());
        if state.failing.contains(path) {
            return Err(FsOpsError::InvalidInput {
                field: "path",
                reason: "injected probe failure",
                value: Some(path.display().to_string()),
            });
        }
        state
            .usage
            .get(path)
            .copied()
            .ok_or_else(|| FsOpsError::InvalidInput {
                field: "path",
                reason: "no reading configured",
                value: Some(path.display().to_string()),
            })
    }
}
