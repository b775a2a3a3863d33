// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash the kernel through sysrq so kdump captures a vmcore.
//!
//! This action performs no verification of the host's kdump setup; it is
//! assumed kdump has been tested before deploying a rig with it. The rig
//! core always runs kdump after the archive has been written, since the
//! side effect resets the host, and the vmcore is therefore never part of
//! the rig archive.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use rig_core::{ConfigError, RigConfig};

use super::{Action, ActionCtx, ActionError};
use crate::options;

const SYSRQ_CONTROL: &str = "/proc/sys/kernel/sysrq";
const SYSRQ_TRIGGER: &str = "/proc/sysrq-trigger";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KdumpOptions {
    /// Fail-safe: a crash-the-host action must be asked for explicitly
    enabled: bool,
    /// Value to write to /proc/sys/kernel/sysrq before arming
    #[serde(default)]
    sysrq: Option<i64>,
}

#[derive(Debug)]
pub struct KdumpAction {
    sysrq: Option<i64>,
}

impl KdumpAction {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        let opts: KdumpOptions = options::from_value("action", "kdump", value)?;
        if !opts.enabled {
            return Err(ConfigError::invalid("enabled", "must be set to true"));
        }
        if opts.sysrq == Some(0) {
            return Err(ConfigError::invalid(
                "sysrq",
                "setting 'sysrq' to 0 would disable kdump, cannot continue configuring this \
                 action",
            ));
        }
        Ok(Self { sysrq: opts.sysrq })
    }
}

#[async_trait]
impl Action for KdumpAction {
    fn name(&self) -> &'static str {
        "kdump"
    }

    fn priority(&self) -> i32 {
        10000
    }

    fn produces(&self) -> serde_json::Value {
        json!("A vmcore at your configured crash location following restart")
    }

    async fn pre_action(&mut self, _ctx: &mut ActionCtx) -> Result<(), ActionError> {
        if let Some(sysrq) = self.sysrq {
            info!("Setting {SYSRQ_CONTROL} to {sysrq}");
            tokio::fs::write(SYSRQ_CONTROL, sysrq.to_string()).await.map_err(|err| {
                ActionError::Failed(format!("failed to set {SYSRQ_CONTROL}: {err}"))
            })?;
        }
        Ok(())
    }

    async fn trigger(&mut self, _ctx: &mut ActionCtx) -> Result<(), ActionError> {
        info!(
            "Writing 'c' to {SYSRQ_TRIGGER} - look in your configured crash location for a \
             vmcore after reboot"
        );
        tokio::fs::write(SYSRQ_TRIGGER, "c").await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "kdump_tests.rs"]
mod tests;
