// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rig-level options shared by every monitor and action.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_interval() -> u64 {
    1
}

fn default_repeat_delay() -> u64 {
    1
}

/// Options that apply to the rig as a whole, as opposed to the options of
/// any individual monitor or action. Populated from the top level of a
/// rigfile; every field except `name` has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RigConfig {
    /// Unique name of the rig. Doubles as the control socket name and is
    /// embedded in the archive filename.
    pub name: String,

    /// Seconds between samples for polling monitors
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Seconds to wait between a monitor firing and actions running
    #[serde(default)]
    pub delay: u64,

    /// How many additional times repeatable actions run after the first
    #[serde(default)]
    pub repeat: u64,

    /// Seconds between repeat iterations of a single action
    #[serde(default = "default_repeat_delay")]
    pub repeat_delay: u64,

    /// Skip archive creation after a trigger
    #[serde(default)]
    pub no_archive: bool,

    /// Stay attached to the console instead of daemonizing
    #[serde(default)]
    pub foreground: bool,

    /// Override the scratch directory prefix for this rig
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmpdir: Option<PathBuf>,
}

impl RigConfig {
    /// Validate the option ranges the rest of the system relies on.
    ///
    /// `interval` and `repeat_delay` are sleep lengths; zero would turn
    /// polling loops into busy loops, so both must be at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::invalid("name", "must not be empty"));
        }
        if self.name.contains('/') || self.name.contains('\0') {
            return Err(ConfigError::invalid("name", "must be usable as a filename"));
        }
        if self.interval < 1 {
            return Err(ConfigError::invalid("interval", "must be at least 1 second"));
        }
        if self.repeat_delay < 1 {
            return Err(ConfigError::invalid("repeat_delay", "must be at least 1 second"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
