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

//! Logging, metrics and span helpers shared by the seedr crates.
//!
//! Layout: `init.rs` (subscriber setup), `context.rs` (application span),
//! `metrics.rs` (Prometheus registry), `error.rs` (telemetry errors).

pub mod context;
pub mod error;
pub mod init;
pub mod metrics;

pub use context::{GlobalContextGuard, record_driver};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use metrics::{EVICTION_ACTIONS, EVICTION_RULES, Metrics, MetricsSnapshot, PASS_OUTCOMES};
