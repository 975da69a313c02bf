#![forbid(unsafe_code)]
#![warn(
    unused,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Seedr application: tier table, eviction engine, schedulers and bootstrap.
//!
//! Layout: `tiers.rs` (priority-ordered tiers), `directory.rs` (per-pass
//! torrent snapshot), `retention.rs` (eviction engine), `report.rs` (pass
//! outcome), `stats.rs` (transfer summary), `scheduler.rs` (update and stat
//! cadences), `drivers.rs` (driver registry), `bootstrap.rs` (process wiring),
//! `cli.rs` (command-line flags).

/// Process wiring.
pub mod bootstrap;
/// Command-line flags.
pub mod cli;
/// Per-pass torrent snapshot.
pub mod directory;
/// Driver registry.
pub mod drivers;
/// Application error type.
pub mod error;
/// Pass outcome types.
pub mod report;
/// Eviction engine.
pub mod retention;
/// Update and stat cadences.
pub mod scheduler;
/// Transfer summary reporting.
pub mod stats;
/// Storage tiers.
pub mod tiers;

pub use bootstrap::{RunOptions, run_app, run_with};
pub use cli::Cli;
pub use directory::{ELIGIBLE_STATES, TorrentDirectory};
pub use drivers::{DriverFactory, DriverRegistry, QBittorrentFactory};
pub use error::{AppError, AppResult};
pub use report::{Eviction, EvictionAction, EvictionRule, PassReport, TierReport};
pub use retention::{RetentionEngine, RetentionPolicy};
pub use scheduler::{Scheduler, run_logged_pass, run_stat_loop, run_update_loop};
pub use stats::{StatReporter, TransferSummary, format_bytes};
pub use tiers::{EvictionTarget, Tier, TierTable};
