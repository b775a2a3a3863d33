// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch whole-host metrics: load average and CPU temperature.
//!
//! Temperature comes from the first thermal zone under
//! `/sys/class/thermal`; hosts with no thermal zone reject the option at
//! configure time.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use procfs::Current;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinSet;
use tracing::info;

use rig_core::{ConfigError, RigConfig};

use super::{first_completed, Monitor, MonitorError, MonitorOutcome, MonitorResult};
use crate::options;

const THERMAL_DIR: &str = "/sys/class/thermal";

fn default_loadavg_interval() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SystemOptions {
    /// Threshold CPU temperature in Celsius
    #[serde(default)]
    temperature: Option<i64>,
    /// Threshold load average
    #[serde(default)]
    loadavg: Option<f64>,
    /// Which loadavg window to track: 1, 5, or 15 minutes
    #[serde(default = "default_loadavg_interval")]
    loadavg_interval: u64,
}

#[derive(Debug)]
pub struct SystemMonitor {
    temperature: Option<(i64, PathBuf)>,
    loadavg: Option<(f64, u64)>,
}

impl SystemMonitor {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        let opts: SystemOptions = options::from_value("monitor", "system", value)?;

        if opts.temperature.is_none() && opts.loadavg.is_none() {
            return Err(ConfigError::Invalid(
                "system monitor: must specify at least one of 'temperature' or 'loadavg'"
                    .to_string(),
            ));
        }

        let temperature = match opts.temperature {
            Some(threshold) => Some((threshold, find_thermal_zone()?)),
            None => None,
        };

        let loadavg = match opts.loadavg {
            Some(threshold) => {
                if ![1, 5, 15].contains(&opts.loadavg_interval) {
                    return Err(ConfigError::invalid(
                        "loadavg_interval",
                        format!("must be 1, 5, or 15, not {}", opts.loadavg_interval),
                    ));
                }
                Some((threshold, opts.loadavg_interval))
            }
            None => None,
        };

        Ok(Self { temperature, loadavg })
    }
}

fn find_thermal_zone() -> Result<PathBuf, ConfigError> {
    let entries = std::fs::read_dir(THERMAL_DIR).map_err(|_| {
        ConfigError::Invalid(
            "system monitor: local hardware does not appear to report CPU temperatures"
                .to_string(),
        )
    })?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with("thermal_zone") {
            let temp = entry.path().join("temp");
            if temp.exists() {
                return Ok(temp);
            }
        }
    }
    Err(ConfigError::Invalid(
        "system monitor: local hardware does not appear to report CPU temperatures".to_string(),
    ))
}

#[async_trait]
impl Monitor for SystemMonitor {
    fn name(&self) -> &'static str {
        "system"
    }

    fn monitoring(&self) -> serde_json::Value {
        let mut info = json!({});
        if let Some((threshold, _)) = &self.temperature {
            info["temperature"] = json!(format!("{threshold}C"));
        }
        if let Some((threshold, window)) = &self.loadavg {
            info["loadavg"] = json!(format!(">= {threshold} (interval: {window})"));
        }
        info
    }

    async fn start(&self, interval: Duration) -> MonitorResult {
        let mut workers = JoinSet::new();
        if let Some((threshold, path)) = &self.temperature {
            workers.spawn(watch_temperature(*threshold, path.clone(), interval));
        }
        if let Some((threshold, window)) = &self.loadavg {
            workers.spawn(watch_loadavg(*threshold, *window, interval));
        }
        first_completed(workers).await
    }
}

async fn watch_temperature(threshold: i64, path: PathBuf, interval: Duration) -> MonitorResult {
    loop {
        let raw = tokio::fs::read_to_string(&path).await?;
        // sysfs reports millidegrees
        let current = raw
            .trim()
            .parse::<i64>()
            .map_err(|e| MonitorError::Worker(format!("bad thermal reading '{raw}': {e}")))?
            / 1000;
        if current >= threshold {
            info!("System temperature is {current} C, exceeding threshold of {threshold} C");
            return Ok(MonitorOutcome::Triggered(format!("temperature at {current}C")));
        }
        tokio::time::sleep(interval).await;
    }
}

async fn watch_loadavg(threshold: f64, window: u64, interval: Duration) -> MonitorResult {
    loop {
        let loadavg = procfs::LoadAverage::current()
            .map_err(|e| MonitorError::Worker(format!("could not read loadavg: {e}")))?;
        let value = match window {
            5 => loadavg.five,
            15 => loadavg.fifteen,
            _ => loadavg.one,
        } as f64;
        if value >= threshold {
            info!(
                "System {window}-minute loadavg at {value}, exceeding threshold of {threshold}"
            );
            return Ok(MonitorOutcome::Triggered(format!("loadavg at {value}")));
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
