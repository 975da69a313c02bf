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

//! Client-agnostic torrent interfaces and DTOs.
//!
//! Layout: `model.rs` (torrent snapshot and state types), `driver.rs` (the
//! `TorrentDriver` capability trait), `guard.rs` (serialised access to a
//! driver connection), `error.rs` (driver error taxonomy).

pub mod driver;
pub mod error;
pub mod guard;
pub mod model;

pub use driver::TorrentDriver;
pub use error::{TorrentError, TorrentResult};
pub use guard::ConnectionGuard;
pub use model::{StateFilter, Torrent, TorrentState, TransferStats};
