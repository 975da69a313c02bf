//! Scriptable in-memory torrent client.
//!
//! Moves relocate the torrent immediately but can be made to report
//! `Moving` for a number of status polls; failures and vanishing torrents are
//! injected per hash.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use seedr_torrent_core::{
    StateFilter, Torrent, TorrentDriver, TorrentError, TorrentResult, TorrentState,
};

/// Call observed by a [`FakeDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    /// `connect`.
    Connect,
    /// `list_torrents`.
    List,
    /// `move_torrent`.
    Move {
        /// Target hash.
        hash: String,
        /// Destination directory.
        destination: String,
    },
    /// `remove_torrent`.
    Remove {
        /// Target hash.
        hash: String,
        /// Whether payload deletion was requested.
        delete_data: bool,
    },
    /// `torrent` status lookup.
    Status {
        /// Target hash.
        hash: String,
    },
    /// `close`.
    Close,
}

impl DriverCall {
    /// Whether the call changes client state.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::Move { .. } | Self::Remove { .. })
    }
}

#[derive(Default)]
struct FakeState {
    torrents: Vec<Torrent>,
    calls: Vec<DriverCall>,
    move_polls: usize,
    moving: HashMap<String, (usize, TorrentState)>,
    failing_moves: HashSet<String>,
    failing_removes: HashSet<String>,
    vanish_on_move: HashSet<String>,
    status_errors: HashMap<String, usize>,
    fail_list: bool,
}

/// In-memory [`TorrentDriver`] with call recording and failure injection.
#[derive(Default)]
pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    /// Driver that knows `torrents`, listed in the given order.
    #[must_use]
    pub fn new(torrents: Vec<Torrent>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                torrents,
                ..FakeState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moved torrents report `Moving` for `polls` status lookups before settling.
    #[must_use]
    pub fn with_move_polls(self, polls: usize) -> Self {
        self.lock().move_polls = polls;
        self
    }

    /// Reject moves of `hash`.
    pub fn fail_move(&self, hash: &str) {
        self.lock().failing_moves.insert(hash.to_string());
    }

    /// Reject removals of `hash`.
    pub fn fail_remove(&self, hash: &str) {
        self.lock().failing_removes.insert(hash.to_string());
    }

    /// Forget `hash` as soon as it has been moved.
    pub fn vanish_after_move(&self, hash: &str) {
        self.lock().vanish_on_move.insert(hash.to_string());
    }

    /// Fail the next `times` status lookups of `hash`.
    pub fn fail_status(&self, hash: &str, times: usize) {
        self.lock().status_errors.insert(hash.to_string(), times);
    }

    /// Make every listing fail.
    pub fn fail_listing(&self) {
        self.lock().fail_list = true;
    }

    /// Every call observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    /// Only the state-changing calls, in order.
    #[must_use]
    pub fn mutations(&self) -> Vec<DriverCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    /// `(hash, destination)` of every move request, successful or not.
    #[must_use]
    pub fn moves(&self) -> Vec<(String, String)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Move { hash, destination } => Some((hash.clone(), destination.clone())),
                _ => None,
            })
            .collect()
    }

    /// Hashes of every removal request, successful or not.
    #[must_use]
    pub fn removals(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Remove { hash, .. } => Some(hash.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of status lookups issued for `hash`.
    #[must_use]
    pub fn status_polls(&self, hash: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, DriverCall::Status { hash: polled } if polled == hash))
            .count()
    }

    /// Torrents the client currently knows.
    #[must_use]
    pub fn torrents(&self) -> Vec<Torrent> {
        self.lock().torrents.clone()
    }
}

fn injected(operation: &'static str, hash: Option<&str>) -> TorrentError {
    TorrentError::driver(operation, hash, io::Error::other("injected failure"))
}

fn unknown(hash: &str) -> TorrentError {
    TorrentError::UnknownTorrent {
        hash: hash.to_string(),
    }
}

#[async_trait]
impl TorrentDriver for FakeDriver {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn connect(&self) -> TorrentResult<()> {
        self.lock().calls.push(DriverCall::Connect);
        Ok(())
    }

    async fn list_torrents(&self, filter: &StateFilter) -> TorrentResult<Vec<Torrent>> {
        let mut state = self.lock();
        state.calls.push(DriverCall::List);
        if state.fail_list {
            return Err(injected("list_torrents", None));
        }
        Ok(state
            .torrents
            .iter()
            .filter(|torrent| filter.matches(torrent.state))
            .cloned()
            .collect())
    }

    async fn move_torrent(&self, hash: &str, destination: &str) -> TorrentResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.calls.push(DriverCall::Move {
            hash: hash.to_string(),
            destination: destination.to_string(),
        });
        if state.failing_moves.contains(hash) {
            return Err(injected("move_torrent", Some(hash)));
        }
        if state.vanish_on_move.contains(hash) {
            state.torrents.retain(|torrent| torrent.hash != hash);
            return Ok(());
        }

        let polls = state.move_polls;
        let torrent = state
            .torrents
            .iter_mut()
            .find(|torrent| torrent.hash == hash)
            .ok_or_else(|| unknown(hash))?;
        torrent.download_location = destination.to_string();
        let prior = torrent.state;
        if polls > 0 {
            torrent.state = TorrentState::Moving;
            state.moving.insert(hash.to_string(), (polls, prior));
        }
        Ok(())
    }

    async fn remove_torrent(&self, hash: &str, delete_data: bool) -> TorrentResult<()> {
        let mut state = self.lock();
        state.calls.push(DriverCall::Remove {
            hash: hash.to_string(),
            delete_data,
        });
        if state.failing_removes.contains(hash) {
            return Err(injected("remove_torrent", Some(hash)));
        }
        let before = state.torrents.len();
        state.torrents.retain(|torrent| torrent.hash != hash);
        if state.torrents.len() == before {
            return Err(unknown(hash));
        }
        Ok(())
    }

    async fn torrent(&self, hash: &str) -> TorrentResult<Torrent> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.calls.push(DriverCall::Status {
            hash: hash.to_string(),
        });
        if let Some(remaining) = state.status_errors.get_mut(hash)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(injected("torrent", Some(hash)));
        }

        let settled = match state.moving.get_mut(hash) {
            Some((remaining, _)) if *remaining > 0 => {
                *remaining -= 1;
                None
            }
            Some((_, prior)) => Some(*prior),
            None => None,
        };
        if let Some(prior) = settled {
            state.moving.remove(hash);
            if let Some(torrent) = state.torrents.iter_mut().find(|torrent| torrent.hash == hash) {
                torrent.state = prior;
            }
        }

        state
            .torrents
            .iter()
            .find(|torrent| torrent.hash == hash)
            .cloned()
            .ok_or_else(|| unknown(hash))
    }

    async fn close(&self) -> TorrentResult<()> {
        self.lock().calls.push(DriverCall::Close);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::torrent;

    #[tokio::test]
    async fn moved_torrent_reports_moving_until_polls_elapse() -> anyhow::Result<()> {
        let driver = FakeDriver::new(vec![torrent("a", "/fast", 10, 1.0, 1)]).with_move_polls(2);
        driver.move_torrent("a", "/slow").await?;

        assert_eq!(driver.torrent("a").await?.state, TorrentState::Moving);
        assert_eq!(driver.torrent("a").await?.state, TorrentState::Moving);
        let settled = driver.torrent("a").await?;
        assert_eq!(settled.state, TorrentState::Seeding);
        assert_eq!(settled.download_location, "/slow");
        assert_eq!(driver.status_polls("a"), 3);
        Ok(())
    }

    #[tokio::test]
    async fn injected_failures_are_reported() -> anyhow::Result<()> {
        let driver = FakeDriver::new(vec![torrent("a", "/fast", 10, 1.0, 1)]);
        driver.fail_move("a");
        driver.fail_status("a", 1);

        assert!(driver.move_torrent("a", "/slow").await.is_err());
        assert!(driver.torrent("a").await.is_err());
        assert!(driver.torrent("a").await.is_ok());
        assert_eq!(driver.moves(), vec![("a".to_string(), "/slow".to_string())]);
        Ok(())
    }

    #[tokio::test]
    async fn removal_and_vanish_forget_torrents() -> anyhow::Result<()> {
        let driver = FakeDriver::new(vec![
            torrent("a", "/fast", 10, 1.0, 1),
            torrent("b", "/fast", 10, 1.0, 2),
        ]);
        driver.vanish_after_move("b");

        driver.remove_torrent("a", true).await?;
        driver.move_torrent("b", "/slow").await?;
        assert!(driver.torrent("b").await.expect_err("b vanished").is_unknown_torrent());
        assert!(driver.torrents().is_empty());
        assert_eq!(driver.mutations().len(), 2);
        assert!(driver.remove_torrent("a", true).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn listing_respects_filter_and_injected_failure() -> anyhow::Result<()> {
        let mut paused = torrent("p", "/fast", 10, 1.0, 1);
        paused.state = TorrentState::Paused;
        let driver = FakeDriver::new(vec![torrent("s", "/fast", 10, 1.0, 2), paused]);

        let seeding = driver
            .list_torrents(&StateFilter::only([TorrentState::Seeding]))
            .await?;
        assert_eq!(seeding.len(), 1);
        assert_eq!(driver.list_torrents(&StateFilter::Any).await?.len(), 2);

        driver.fail_listing();
        assert!(driver.list_torrents(&StateFilter::Any).await.is_err());
        Ok(())
    }
}
