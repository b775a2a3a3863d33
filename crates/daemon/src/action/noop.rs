// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Do nothing. Used for testing rig configurations.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use rig_core::{ConfigError, RigConfig};

use super::{Action, ActionCtx, ActionError};
use crate::options;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoopOptions {
    /// Fail-safe so an empty mapping does not silently configure the rig
    /// with an action that collects nothing
    enabled: bool,
}

#[derive(Debug)]
pub struct NoopAction;

impl NoopAction {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        let opts: NoopOptions = options::from_value("action", "noop", value)?;
        if !opts.enabled {
            return Err(ConfigError::invalid("enabled", "must be set to true"));
        }
        Ok(Self)
    }
}

#[async_trait]
impl Action for NoopAction {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn produces(&self) -> serde_json::Value {
        serde_json::json!("nothing")
    }

    async fn trigger(&mut self, _ctx: &mut ActionCtx) -> Result<(), ActionError> {
        info!("No-op action triggered. Doing nothing.");
        Ok(())
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
