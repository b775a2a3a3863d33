// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upper bound on how long a rig runs.
//!
//! By default the rig triggers when the timer expires; with
//! `trigger_on_expiry: false` it instead terminates without running
//! actions, which turns the timer into a watchdog for rigs that should
//! not wait forever.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use rig_core::{ConfigError, RigConfig};
use rig_core::units::parse_duration;

use crate::options::{self, NameOrNumber};
use super::{Monitor, MonitorOutcome, MonitorResult};

fn default_trigger_on_expiry() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimerOptions {
    /// Seconds, or a string of suffixed terms like "1d 2h 30m"
    timeout: NameOrNumber,
    #[serde(default = "default_trigger_on_expiry")]
    trigger_on_expiry: bool,
}

#[derive(Debug)]
pub struct TimerMonitor {
    timeout: Duration,
    display: String,
    trigger_on_expiry: bool,
}

impl TimerMonitor {
    pub fn configure(
        value: &serde_yaml::Value,
        _config: &RigConfig,
    ) -> Result<Self, ConfigError> {
        let opts: TimerOptions = options::from_value("monitor", "timer", value)?;
        let display = opts.timeout.into_string();
        let seconds = parse_duration(&display)?;
        if seconds == 0 {
            return Err(ConfigError::invalid("timeout", "must be at least 1 second"));
        }
        Ok(Self {
            timeout: Duration::from_secs(seconds),
            display,
            trigger_on_expiry: opts.trigger_on_expiry,
        })
    }
}

#[async_trait]
impl Monitor for TimerMonitor {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn monitoring(&self) -> serde_json::Value {
        json!({
            "timeout": self.display,
            "trigger_on_expiry": self.trigger_on_expiry,
        })
    }

    async fn start(&self, _interval: Duration) -> MonitorResult {
        let when = chrono::Utc::now() + chrono::Duration::seconds(self.timeout.as_secs() as i64);
        info!(
            "Beginning timer monitor. Timeout will expire at {}",
            when.format("%Y/%m/%d %H:%M:%S UTC")
        );
        tokio::time::sleep(self.timeout).await;
        info!("Timer monitor timeout expired.");
        if self.trigger_on_expiry {
            Ok(MonitorOutcome::Triggered(format!("timeout of {} expired", self.display)))
        } else {
            Ok(MonitorOutcome::Cancelled(
                "timeout expired in timer monitor with trigger_on_expiry = false".to_string(),
            ))
        }
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
