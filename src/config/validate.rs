// src/config/validate.rs

use std::collections::HashSet;
use std::path::{Component, Path};

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_globs(cfg)?;
    validate_bundle_configs(cfg)?;
    validate_extensions(cfg)?;
    validate_watch_settings(cfg)?;
    Ok(())
}

fn validate_globs(cfg: &RawConfigFile) -> Result<()> {
    let sections: [(&str, &[String]); 5] = [
        ("styles.src", &cfg.styles.src),
        ("images.src", &cfg.images.src),
        ("markup.src", &cfg.markup.src),
        ("livereload.watch", &cfg.livereload.watch),
        ("livereload.exclude", &cfg.livereload.exclude),
    ];

    for (section, patterns) in sections {
        for pattern in patterns {
            if let Err(e) = Glob::new(pattern) {
                return Err(PipelineError::ConfigError(format!(
                    "[{}] invalid glob pattern '{}': {}",
                    section, pattern, e
                )));
            }
        }
    }
    Ok(())
}

fn validate_bundle_configs(cfg: &RawConfigFile) -> Result<()> {
    let mut outputs = HashSet::new();

    for (idx, bundle) in cfg.bundle.configs.iter().enumerate() {
        if bundle.entry.as_os_str().is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "bundle config #{} has an empty `entry`",
                idx
            )));
        }

        if !is_plain_file_name(&bundle.output_name) {
            return Err(PipelineError::ConfigError(format!(
                "bundle config #{} has invalid `output_name` '{}' (expected a file name without directories)",
                idx, bundle.output_name
            )));
        }

        // All bundles share the output directory; two contexts writing the
        // same file would race.
        let output = normalize(&bundle.output_path());
        if !outputs.insert(output.clone()) {
            return Err(PipelineError::ConfigError(format!(
                "bundle output '{}' is produced by more than one bundle config",
                output
            )));
        }
    }
    Ok(())
}

fn validate_extensions(cfg: &RawConfigFile) -> Result<()> {
    for ext in cfg.bundle.extensions.iter() {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(PipelineError::ConfigError(format!(
                "[bundle].extensions entry '{}' must start with '.'",
                ext
            )));
        }
    }
    Ok(())
}

fn validate_watch_settings(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.queue_length == 0 {
        return Err(PipelineError::ConfigError(
            "[watch].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Lexically normalise a relative path (`./build/../build/a.js` ->
/// `build/a.js`) so duplicate outputs are detected regardless of spelling.
fn normalize(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push("..".to_string()),
            },
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    parts.join("/")
}
