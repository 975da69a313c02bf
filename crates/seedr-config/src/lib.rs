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

//! File-backed configuration for the retention daemon.
//!
//! Layout: `model.rs` (document sections and validated settings), `validate.rs`
//! (byte/duration parsing and field checks), `loader.rs` (file discovery),
//! `defaults.rs` (fallback values).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::{CONFIG_ENV, CONFIG_FILE_NAMES, DEFAULT_MOVE_POLL_INTERVAL};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_from_path, parse_config, resolve_config_path, search_dirs};
pub use model::{
    ClientConfig, ConfigDocument, ConfigSnapshot, GeneralSettings, LogSettings, SpaceThreshold,
    TierConfig,
};
pub use validate::{parse_byte_size, parse_duration, validate_document};
