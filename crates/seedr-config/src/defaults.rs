//! Default values applied when the configuration file omits a field.

use std::time::Duration;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "SEEDR_CONFIG";
/// File names probed in each search directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["seedr.yaml", "seedr.yml"];
/// Tracing level used when `log.level` is absent.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Client host used when `client.host` is absent.
pub const DEFAULT_CLIENT_HOST: &str = "localhost";
/// Ratio value that leaves the ratio rule disabled.
pub const DEFAULT_MAX_RATIO: f64 = -1.0;
/// Delay between move-completion polls.
pub const DEFAULT_MOVE_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub(crate) fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

pub(crate) fn default_client_host() -> String {
    DEFAULT_CLIENT_HOST.to_string()
}

pub(crate) const fn default_max_ratio() -> f64 {
    DEFAULT_MAX_RATIO
}
