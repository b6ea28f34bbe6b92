// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults for missing sections (handled by `serde` + `Default`).
/// - Checks globs, bundle outputs and watch settings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Default config file name, looked up in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetpipe.toml")
}

/// Resolve the configuration and the project root for a run.
///
/// - An explicit path must exist; its directory becomes the project root.
/// - Without one, `Assetpipe.toml` in the current directory is used when
///   present, otherwise the built-in defaults with the current directory as
///   root.
pub fn resolve_config(explicit: Option<&str>) -> Result<(ConfigFile, PathBuf)> {
    if let Some(path) = explicit {
        let path = PathBuf::from(path);
        let cfg = load_and_validate(&path)?;
        return Ok((cfg, config_root_dir(&path)));
    }

    let default_path = default_config_path();
    if default_path.is_file() {
        let cfg = load_and_validate(&default_path)?;
        return Ok((cfg, config_root_dir(&default_path)));
    }

    info!("no {:?} found; using built-in defaults", default_path);
    Ok((ConfigFile::default(), current_dir()))
}

/// Figure out the project root for a config path.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetpipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetpipe.toml" (parent = ""),
///   we fall back to the current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => current_dir(),
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
