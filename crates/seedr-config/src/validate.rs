//! Validation helpers and parsing utilities for configuration documents.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::defaults::DEFAULT_MOVE_POLL_INTERVAL;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    ByteSizeValue, ClientConfig, ClientSection, ConfigDocument, ConfigSnapshot, GeneralSection,
    GeneralSettings, LogSection, LogSettings, SpaceThreshold, TierConfig, TierSection,
};

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Parse a humanised byte quantity.
///
/// Decimal units (`KB`, `MB`, `GB`, `TB`, `PB`) are powers of 1000 and binary
/// units (`KiB` .. `PiB`) powers of 1024. Units are case-insensitive, the
/// trailing `B` is optional and a bare number is a byte count.
///
/// # Errors
///
/// Returns a static reason when the value is empty, negative, uses an unknown
/// unit or overflows `u64`.
pub fn parse_byte_size(input: &str) -> Result<u64, &'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("must not be empty");
    }
    let (number, unit) = split_number(trimmed);
    if number.is_empty() {
        return Err("must start with a non-negative number");
    }
    let multiplier = byte_unit_multiplier(unit.trim())?;

    if number.contains('.') {
        let value: f64 = number.parse().map_err(|_| "invalid number")?;
        return scale_fraction(value, multiplier);
    }
    let value: u64 = number.parse().map_err(|_| "invalid number")?;
    value.checked_mul(multiplier).ok_or("out of range")
}

/// Parse a duration such as `30s`, `250ms` or `1h30m`.
///
/// Accepted units are `ns`, `us`/`µs`, `ms`, `s`, `m` and `h`; segments may be
/// chained and may carry a fractional part (`1.5h`).
///
/// # Errors
///
/// Returns a static reason when a segment lacks a number or unit, uses an
/// unknown unit or the total overflows.
pub fn parse_duration(input: &str) -> Result<Duration, &'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("must not be empty");
    }

    let mut total_nanos: u64 = 0;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let (number, tail) = split_number(rest);
        if number.is_empty() {
            return Err("expected a number");
        }
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);
        let unit_nanos = duration_unit_nanos(unit)?;

        let segment = if number.contains('.') {
            let value: f64 = number.parse().map_err(|_| "invalid number")?;
            scale_fraction(value, unit_nanos)?
        } else {
            let value: u64 = number.parse().map_err(|_| "invalid number")?;
            value.checked_mul(unit_nanos).ok_or("out of range")?
        };
        total_nanos = total_nanos.checked_add(segment).ok_or("out of range")?;
        rest = next;
    }
    Ok(Duration::from_nanos(total_nanos))
}

fn split_number(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(input.len());
    input.split_at(end)
}

fn byte_unit_multiplier(unit: &str) -> Result<u64, &'static str> {
    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "p" | "pb" => 1_000_000_000_000_000,
        "ki" | "kib" => 1 << 10,
        "mi" | "mib" => 1 << 20,
        "gi" | "gib" => 1 << 30,
        "ti" | "tib" => 1 << 40,
        "pi" | "pib" => 1 << 50,
        _ => return Err("unknown size unit"),
    };
    Ok(multiplier)
}

fn duration_unit_nanos(unit: &str) -> Result<u64, &'static str> {
    match unit {
        "ns" => Ok(1),
        "us" | "µs" => Ok(NANOS_PER_MICRO),
        "ms" => Ok(NANOS_PER_MILLI),
        "s" => Ok(NANOS_PER_SECOND),
        "m" => Ok(60 * NANOS_PER_SECOND),
        "h" => Ok(3_600 * NANOS_PER_SECOND),
        "" => Err("missing duration unit"),
        _ => Err("unknown duration unit"),
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn scale_fraction(value: f64, multiplier: u64) -> Result<u64, &'static str> {
    let scaled = (value * multiplier as f64).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled >= u64::MAX as f64 {
        return Err("out of range");
    }
    Ok(scaled as u64)
}

/// Validate a parsed document and convert it into a [`ConfigSnapshot`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field that fails.
pub fn validate_document(
    document: ConfigDocument,
    source: Option<PathBuf>,
) -> ConfigResult<ConfigSnapshot> {
    let general = validate_general(&document.general)?;
    let log = validate_log(&document.log)?;
    let client = validate_client(document.client)?;
    let tiers = validate_tiers(&document.tiers)?;

    Ok(ConfigSnapshot {
        source,
        general,
        log,
        client,
        tiers,
    })
}

fn required_duration(section: &str, field: &str, raw: &str) -> ConfigResult<Duration> {
    let value = parse_duration(raw)
        .map_err(|reason| ConfigError::invalid(section, field, Some(raw.to_string()), reason))?;
    if value.is_zero() {
        return Err(ConfigError::invalid(
            section,
            field,
            Some(raw.to_string()),
            "must be greater than zero",
        ));
    }
    Ok(value)
}

fn validate_general(section: &GeneralSection) -> ConfigResult<GeneralSettings> {
    let update_interval = required_duration("general", "update_interval", &section.update_interval)?;
    let stat_interval = required_duration("general", "stat_interval", &section.stat_interval)?;
    let move_poll_interval = match section.move_poll_interval.as_deref() {
        Some(raw) => required_duration("general", "move_poll_interval", raw)?,
        None => DEFAULT_MOVE_POLL_INTERVAL,
    };
    let move_timeout = section
        .move_timeout
        .as_deref()
        .map(|raw| required_duration("general", "move_timeout", raw))
        .transpose()?;

    Ok(GeneralSettings {
        update_interval,
        stat_interval,
        dry_run: section.dry_run,
        move_poll_interval,
        move_timeout,
    })
}

fn validate_log(section: &LogSection) -> ConfigResult<LogSettings> {
    let level = section.level.trim().to_ascii_lowercase();
    if level.is_empty() {
        return Err(ConfigError::invalid(
            "log",
            "level",
            Some(section.level.clone()),
            "must not be empty",
        ));
    }
    let format = match section.format.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let lowered = raw.to_ascii_lowercase();
            if !matches!(lowered.as_str(), "pretty" | "json") {
                return Err(ConfigError::invalid(
                    "log",
                    "format",
                    Some(raw.to_string()),
                    "must be 'pretty' or 'json'",
                ));
            }
            Some(lowered)
        }
    };
    Ok(LogSettings { level, format })
}

fn validate_client(section: ClientSection) -> ConfigResult<ClientConfig> {
    let driver = section.driver.trim().to_ascii_lowercase();
    if driver.is_empty() {
        return Err(ConfigError::invalid(
            "client",
            "driver",
            Some(section.driver),
            "must not be empty",
        ));
    }
    let host = section.host.trim().to_string();
    if host.is_empty() {
        return Err(ConfigError::invalid(
            "client",
            "host",
            Some(section.host),
            "must not be empty",
        ));
    }
    if section.port == 0 {
        return Err(ConfigError::invalid(
            "client",
            "port",
            Some("0".to_string()),
            "must be between 1 and 65535",
        ));
    }
    Ok(ClientConfig {
        driver,
        host,
        port: section.port,
        username: section.user,
        password: section.password,
        tls: section.tls,
    })
}

fn validate_tiers(sections: &[TierSection]) -> ConfigResult<Vec<TierConfig>> {
    if sections.is_empty() {
        return Err(ConfigError::invalid(
            "tiers",
            "tiers",
            None,
            "at least one tier is required",
        ));
    }

    let mut tiers: Vec<TierConfig> = Vec::with_capacity(sections.len());
    for (index, section) in sections.iter().enumerate() {
        let tier = validate_tier(index, section)?;
        if tiers.iter().any(|existing| same_path(&existing.path, &tier.path)) {
            return Err(ConfigError::invalid(
                format!("tiers[{index}]"),
                "path",
                Some(section.path.clone()),
                "duplicate tier path",
            ));
        }
        if !tier.space.is_configured() && tier.ratio_limit().is_none() {
            warn!(
                path = %tier.path.display(),
                "tier has no space threshold and no ratio limit; nothing will be evicted from it"
            );
        }
        tiers.push(tier);
    }
    Ok(tiers)
}

fn validate_tier(index: usize, section: &TierSection) -> ConfigResult<TierConfig> {
    let name = format!("tiers[{index}]");
    let path = section.path.trim();
    if path.is_empty() {
        return Err(ConfigError::invalid(
            name,
            "path",
            Some(section.path.clone()),
            "must not be empty",
        ));
    }

    let min_free_bytes = match &section.min_free {
        None => None,
        Some(ByteSizeValue::Bytes(bytes)) => Some(*bytes),
        Some(ByteSizeValue::Text(raw)) => Some(
            parse_byte_size(raw)
                .map_err(|reason| ConfigError::invalid(&name, "min_free", Some(raw.clone()), reason))?,
        ),
    };

    if let Some(percent) = section.max_used_percent
        && !(percent.is_finite() && (0.0..=100.0).contains(&percent))
    {
        return Err(ConfigError::invalid(
            name,
            "max_used_percent",
            Some(percent.to_string()),
            "must be between 0 and 100",
        ));
    }

    if !section.max_ratio.is_finite() {
        return Err(ConfigError::invalid(
            name,
            "max_ratio",
            Some(section.max_ratio.to_string()),
            "must be a finite number",
        ));
    }

    Ok(TierConfig {
        path: PathBuf::from(path),
        priority: section.priority,
        space: SpaceThreshold {
            min_free_bytes,
            max_used_percent: section.max_used_percent,
        },
        max_ratio: section.max_ratio,
    })
}

// Path equality is component-wise, so a trailing separator does not matter.
fn same_path(left: &Path, right: &Path) -> bool {
    left == right
}
