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

//! Shared test helpers used across the seedr crates.
//! Layout: fixtures.rs (torrent and disk builders), driver.rs (scriptable
//! in-memory torrent client), probe.rs (scriptable disk probe).

pub mod driver;
pub mod fixtures;
pub mod probe;

pub use driver::{DriverCall, FakeDriver};
pub use fixtures::{disk, torrent};
pub use probe::FakeProbe;
