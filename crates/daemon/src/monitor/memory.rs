// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch system memory usage via `/proc/meminfo`.

use std::time::Duration;

use async_trait::async_trait;
use procfs::Current;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use rig_core::units::format_bytes;
use rig_core::{ConfigError, RigConfig};

use super::{Monitor, MonitorError, MonitorOutcome, MonitorResult};
use crate::options::{self, SizeSpec};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MemoryOptions {
    /// Overall usage threshold as a percentage
    #[serde(default)]
    percent: Option<f64>,
    /// Threshold for total memory in use
    #[serde(default)]
    used: Option<SizeSpec>,
    /// Threshold for slab allocations
    #[serde(default)]
    slab: Option<SizeSpec>,
}

#[derive(Debug)]
pub struct MemoryMonitor {
    percent: Option<f64>,
    used: Option<(u64, String)>,
    slab: Option<(u64, String)>,
}

impl MemoryMonitor {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        let opts: MemoryOptions = options::from_value("monitor", "memory", value)?;

        if opts.percent.is_none() && opts.used.is_none() && opts.slab.is_none() {
            return Err(ConfigError::Invalid(
                "memory monitor: must specify at least one of 'percent', 'used', or 'slab'"
                    .to_string(),
            ));
        }
        if let Some(percent) = opts.percent {
            if !(0.0..=100.0).contains(&percent) {
                return Err(ConfigError::invalid("percent", "must be between 0 and 100"));
            }
        }

        let used = opts.used.map(|s| s.to_bytes().map(|b| (b, s.display()))).transpose()?;
        let slab = opts.slab.map(|s| s.to_bytes().map(|b| (b, s.display()))).transpose()?;

        Ok(Self { percent: opts.percent, used, slab })
    }
}

#[async_trait]
impl Monitor for MemoryMonitor {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn monitoring(&self) -> serde_json::Value {
        let mut info = json!({});
        if let Some(percent) = self.percent {
            info["percent"] = json!(format!(">= {percent}%"));
        }
        if let Some((_, display)) = &self.used {
            info["used"] = json!(format!(">= {display}"));
        }
        if let Some((_, display)) = &self.slab {
            info["slab"] = json!(format!(">= {display}"));
        }
        info
    }

    async fn start(&self, interval: Duration) -> MonitorResult {
        // single worker covers every configured statistic
        loop {
            let meminfo = procfs::Meminfo::current()
                .map_err(|e| MonitorError::Worker(format!("could not read meminfo: {e}")))?;
            let available = meminfo.mem_available.unwrap_or(meminfo.mem_free);
            let used = meminfo.mem_total.saturating_sub(available);

            if let Some(threshold) = self.percent {
                let percent =
                    ((used as f64 / meminfo.mem_total as f64 * 100.0) * 100.0).round() / 100.0;
                if percent >= threshold {
                    info!(
                        "Memory usage of {percent}% exceeds specified threshold of {threshold}%."
                    );
                    return Ok(MonitorOutcome::Triggered(format!("memory usage at {percent}%")));
                }
            }
            if let Some((threshold, _)) = self.used {
                if used >= threshold {
                    info!(
                        "Memory used of {} exceeds specified threshold of {}.",
                        format_bytes(used),
                        format_bytes(threshold)
                    );
                    return Ok(MonitorOutcome::Triggered(format!(
                        "memory used at {}",
                        format_bytes(used)
                    )));
                }
            }
            if let Some((threshold, _)) = self.slab {
                if meminfo.slab >= threshold {
                    info!(
                        "Memory slab usage of {} exceeds specified threshold of {}.",
                        format_bytes(meminfo.slab),
                        format_bytes(threshold)
                    );
                    return Ok(MonitorOutcome::Triggered(format!(
                        "slab usage at {}",
                        format_bytes(meminfo.slab)
                    )));
                }
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
