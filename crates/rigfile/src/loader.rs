// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use rig_core::RigConfig;

/// Errors from reading or validating a rigfile.
#[derive(Debug, Error)]
pub enum RigfileError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rigfile is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("rigfile: {0}")]
    Invalid(String),
}

fn default_repeat_delay() -> u64 {
    1
}

fn default_interval() -> u64 {
    1
}

/// Raw top-level document. Explicit fields rather than a flattened
/// [`RigConfig`] because `deny_unknown_fields` does not compose with
/// `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRigfile {
    name: String,
    #[serde(default = "default_interval")]
    interval: u64,
    #[serde(default)]
    delay: u64,
    #[serde(default)]
    repeat: u64,
    #[serde(default = "default_repeat_delay")]
    repeat_delay: u64,
    #[serde(default)]
    no_archive: bool,
    #[serde(default)]
    foreground: bool,
    #[serde(default)]
    tmpdir: Option<PathBuf>,
    #[serde(default)]
    monitors: IndexMap<String, serde_yaml::Value>,
    #[serde(default)]
    actions: IndexMap<String, serde_yaml::Value>,
}

/// A parsed and structurally validated rigfile.
///
/// Monitor and action option maps stay as raw YAML here; the daemon's
/// registry deserializes them into each type's option struct, which is
/// where unknown keys and wrong types are rejected.
#[derive(Debug, Clone)]
pub struct Rigfile {
    pub config: RigConfig,
    pub monitors: IndexMap<String, serde_yaml::Value>,
    pub actions: IndexMap<String, serde_yaml::Value>,
}

/// Load and validate a rigfile from disk.
pub fn load(path: &Path) -> Result<Rigfile, RigfileError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| RigfileError::Read { path: path.to_path_buf(), source })?;
    load_str(&content)
}

/// Load and validate a rigfile from a YAML string.
pub fn load_str(content: &str) -> Result<Rigfile, RigfileError> {
    let raw: RawRigfile = serde_yaml::from_str(content)?;

    let config = RigConfig {
        name: raw.name,
        interval: raw.interval,
        delay: raw.delay,
        repeat: raw.repeat,
        repeat_delay: raw.repeat_delay,
        no_archive: raw.no_archive,
        foreground: raw.foreground,
        tmpdir: raw.tmpdir,
    };
    config.validate().map_err(|e| RigfileError::Invalid(e.to_string()))?;

    if raw.monitors.is_empty() {
        return Err(RigfileError::Invalid("at least one monitor is required".to_string()));
    }
    if raw.actions.is_empty() {
        return Err(RigfileError::Invalid("at least one action is required".to_string()));
    }

    for (name, value) in raw.monitors.iter().chain(raw.actions.iter()) {
        if value.is_null() {
            return Err(RigfileError::Invalid(format!(
                "empty configuration for '{name}' received"
            )));
        }
        if !value.is_mapping() {
            return Err(RigfileError::Invalid(format!(
                "configuration for '{name}' must be a mapping of options"
            )));
        }
    }

    Ok(Rigfile { config, monitors: raw.monitors, actions: raw.actions })
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
