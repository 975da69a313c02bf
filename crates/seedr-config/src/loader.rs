//! Configuration file discovery and loading.
//!
//! Resolution order: an explicit path, then `SEEDR_CONFIG`, then the first
//! `seedr.yaml`/`seedr.yml` found in `$HOME`, `.`, `..` and `../..`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::defaults::{CONFIG_ENV, CONFIG_FILE_NAMES};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ConfigDocument, ConfigSnapshot};
use crate::validate::validate_document;

/// Locate, read and validate the configuration for this process.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] when no file exists in any search
/// location, or the read, parse and validation failures of the chosen file.
pub fn load_config(explicit: Option<&Path>) -> ConfigResult<ConfigSnapshot> {
    let env_value = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let path = resolve_config_path(explicit, env_value.as_deref(), &search_dirs(home))?;
    load_from_path(&path)
}

/// Default search directories given an optional home directory.
#[must_use]
pub fn search_dirs(home: Option<PathBuf>) -> Vec<PathBuf> {
    let mut dirs = Vec::with_capacity(4);
    dirs.extend(home);
    dirs.push(PathBuf::from("."));
    dirs.push(PathBuf::from(".."));
    dirs.push(PathBuf::from("../.."));
    dirs
}

/// Pick the configuration file to load.
///
/// Explicit and environment paths are returned as given, even if missing, so
/// that the read error names the file the operator asked for.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] listing every probed candidate when no
/// explicit path is set and no search directory holds a config file.
pub fn resolve_config_path(
    explicit: Option<&Path>,
    env_value: Option<&Path>,
    search_dirs: &[PathBuf],
) -> ConfigResult<PathBuf> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "using configuration path from command line");
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env_value.filter(|path| !path.as_os_str().is_empty()) {
        debug!(path = %path.display(), env = CONFIG_ENV, "using configuration path from environment");
        return Ok(path.to_path_buf());
    }

    let mut searched = Vec::with_capacity(search_dirs.len() * CONFIG_FILE_NAMES.len());
    for dir in search_dirs {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }
    }
    Err(ConfigError::NotFound { searched })
}

/// Read and validate a configuration file.
///
/// # Errors
///
/// Returns IO, YAML and validation failures.
pub fn load_from_path(path: &Path) -> ConfigResult<ConfigSnapshot> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: ConfigDocument =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
    let snapshot = validate_document(document, Some(path.to_path_buf()))?;
    info!(
        path = %path.display(),
        tiers = snapshot.tiers.len(),
        driver = %snapshot.client.driver,
        "loaded configuration"
    );
    Ok(snapshot)
}

/// Parse and validate a configuration document held in memory.
///
/// # Errors
///
/// Returns YAML and validation failures.
pub fn parse_config(contents: &str) -> ConfigResult<ConfigSnapshot> {
    let document: ConfigDocument = serde_yaml::from_str(contents)
        .map_err(|source| ConfigError::Parse { path: None, source })?;
    validate_document(document, None)
}
