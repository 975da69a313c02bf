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

//! qBittorrent WebUI adapter for the seedr torrent driver interface.
//!
//! Layout: `client.rs` (HTTP client and session cookie), `models.rs` (WebUI
//! payloads and state mapping), `driver.rs` (`TorrentDriver` implementation).

pub mod client;
pub mod driver;
pub mod error;
pub mod models;

pub use client::QBittorrentClient;
pub use driver::{DRIVER_NAME, QBittorrentDriver};
pub use error::{QBittorrentError, Result};
pub use models::{TorrentInfo, map_state};
