#![forbid(unsafe_code)]
#![deny(
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! `seedr` binary: parses flags and hands off to the application bootstrap.

use clap::Parser;
use seedr_app::{AppResult, Cli, run_app};

/// Runs the retention daemon until shutdown, or a single pass with `--once`.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app(Cli::parse().into()).await
}
