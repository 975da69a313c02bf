//! Configuration document shapes and the validated snapshot built from them.
//!
//! # Design
//! - `*Section` types mirror the YAML file one-to-one and keep raw strings for
//!   humanised values (`"50GB"`, `"1h30m"`).
//! - `ConfigSnapshot` and friends carry parsed, validated values only.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_CLIENT_HOST, DEFAULT_LOG_LEVEL, DEFAULT_MAX_RATIO, default_client_host,
    default_log_level, default_max_ratio,
};

/// Top-level YAML document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    /// Scheduling and behaviour switches.
    pub general: GeneralSection,
    /// Logging preferences.
    #[serde(default)]
    pub log: LogSection,
    /// Torrent client connection.
    pub client: ClientSection,
    /// Storage tiers; order only matters between equal priorities.
    #[serde(default)]
    pub tiers: Vec<TierSection>,
}

/// `general:` section as written in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralSection {
    /// Delay between the end of one pass and the start of the next.
    pub update_interval: String,
    /// Period of the transfer statistics log line.
    pub stat_interval: String,
    /// Log decisions without calling the client.
    #[serde(default)]
    pub dry_run: bool,
    /// Delay between move-completion polls.
    #[serde(default)]
    pub move_poll_interval: Option<String>,
    /// Upper bound on a single move wait.
    #[serde(default)]
    pub move_timeout: Option<String>,
}

/// `log:` section as written in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// Level directive handed to the tracing filter.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (`pretty` or `json`).
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

/// `client:` section as written in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    /// Driver registry key (for example `qbittorrent`).
    pub driver: String,
    /// Client host name or address.
    #[serde(default = "default_client_host")]
    pub host: String,
    /// Client port.
    pub port: u16,
    /// Login user.
    #[serde(default, alias = "username")]
    pub user: String,
    /// Login password.
    #[serde(default)]
    pub password: String,
    /// Use HTTPS for the client API.
    #[serde(default)]
    pub tls: bool,
}

/// Byte quantity written either as a plain integer or a humanised string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ByteSizeValue {
    /// Raw byte count.
    Bytes(u64),
    /// Humanised size such as `"50GB"` or `"1.5 TiB"`.
    Text(String),
}

impl fmt::Display for ByteSizeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "{bytes}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// One `tiers:` entry as written in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierSection {
    /// Root directory of the tier.
    pub path: String,
    /// Higher values are visited first.
    #[serde(default)]
    pub priority: i32,
    /// Minimum free space before eviction starts.
    #[serde(default)]
    pub min_free: Option<ByteSizeValue>,
    /// Maximum used percentage before eviction starts.
    #[serde(default)]
    pub max_used_percent: Option<f64>,
    /// Ratio above which torrents leave the tier; negative disables the rule.
    #[serde(default = "default_max_ratio")]
    pub max_ratio: f64,
}

/// Fully validated configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    /// File the snapshot was loaded from, when it came from disk.
    pub source: Option<PathBuf>,
    /// Scheduling and behaviour switches.
    pub general: GeneralSettings,
    /// Logging preferences.
    pub log: LogSettings,
    /// Torrent client connection.
    pub client: ClientConfig,
    /// Tiers in configuration order.
    pub tiers: Vec<TierConfig>,
}

/// Validated `general:` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneralSettings {
    /// Delay between the end of one pass and the start of the next.
    pub update_interval: Duration,
    /// Period of the transfer statistics log line.
    pub stat_interval: Duration,
    /// Log decisions without calling the client.
    pub dry_run: bool,
    /// Delay between move-completion polls.
    pub move_poll_interval: Duration,
    /// Upper bound on a single move wait; `None` waits indefinitely.
    pub move_timeout: Option<Duration>,
}

/// Validated `log:` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSettings {
    /// Level directive handed to the tracing filter.
    pub level: String,
    /// Lowercase output format, when set.
    pub format: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

/// Validated torrent client connection settings.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
    /// Lowercase driver registry key.
    pub driver: String,
    /// Client host name or address.
    pub host: String,
    /// Client port.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Login password.
    #[serde(skip_serializing)]
    pub password: String,
    /// Use HTTPS for the client API.
    pub tls: bool,
}

impl ClientConfig {
    /// Base URL of the client's web API, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            driver: "qbittorrent".to_string(),
            host: DEFAULT_CLIENT_HOST.to_string(),
            port: 8080,
            username: String::new(),
            password: String::new(),
            tls: false,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tls", &self.tls)
            .finish()
    }
}

/// Space pressure thresholds; either limit may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpaceThreshold {
    /// Evict while free bytes are below this value.
    pub min_free_bytes: Option<u64>,
    /// Evict while the used percentage exceeds this value.
    pub max_used_percent: Option<f64>,
}

impl SpaceThreshold {
    /// Whether at least one limit is set.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.min_free_bytes.is_some() || self.max_used_percent.is_some()
    }
}

/// Validated tier definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierConfig {
    /// Root directory of the tier.
    pub path: PathBuf,
    /// Higher values are visited first.
    pub priority: i32,
    /// Space pressure thresholds.
    pub space: SpaceThreshold,
    /// Ratio threshold; negative disables the ratio rule.
    pub max_ratio: f64,
}

impl TierConfig {
    /// Ratio limit when the ratio rule is enabled.
    #[must_use]
    pub fn ratio_limit(&self) -> Option<f64> {
        (self.max_ratio >= 0.0).then_some(self.max_ratio)
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            priority: 0,
            space: SpaceThreshold::default(),
            max_ratio: DEFAULT_MAX_RATIO,
        }
    }
}
