// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch overall CPU utilization, or the share of time spent in specific
//! accounting buckets (iowait, steal, ...), as percentages of total CPU
//! time derived from `/proc/stat` deltas.

use std::time::Duration;

use async_trait::async_trait;
use procfs::CurrentSI;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinSet;
use tracing::info;

use rig_core::{ConfigError, RigConfig};

use super::{first_completed, Monitor, MonitorError, MonitorOutcome, MonitorResult};
use crate::options;

const METRICS: &[&str] =
    &["percent", "iowait", "steal", "system", "nice", "guest", "guest_nice", "user"];

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct CpuOptions {
    #[serde(default)]
    percent: Option<f64>,
    #[serde(default)]
    iowait: Option<f64>,
    #[serde(default)]
    steal: Option<f64>,
    #[serde(default)]
    system: Option<f64>,
    #[serde(default)]
    nice: Option<f64>,
    #[serde(default)]
    guest: Option<f64>,
    #[serde(default)]
    guest_nice: Option<f64>,
    #[serde(default)]
    user: Option<f64>,
}

impl CpuOptions {
    fn entries(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("percent", self.percent),
            ("iowait", self.iowait),
            ("steal", self.steal),
            ("system", self.system),
            ("nice", self.nice),
            ("guest", self.guest),
            ("guest_nice", self.guest_nice),
            ("user", self.user),
        ]
    }
}

#[derive(Debug)]
pub struct CpuMonitor {
    percent: Option<f64>,
    /// (metric name, threshold) for the time-fraction metrics
    metrics: Vec<(&'static str, f64)>,
}

impl CpuMonitor {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        let opts: CpuOptions = options::from_value("monitor", "cpu", value)?;

        let mut any = false;
        for (name, threshold) in opts.entries() {
            if let Some(t) = threshold {
                any = true;
                if t > 100.0 {
                    return Err(ConfigError::invalid(name, "cannot exceed 100"));
                }
                if t < 0.0 {
                    return Err(ConfigError::invalid(name, "must not be negative"));
                }
            }
        }
        if !any {
            return Err(ConfigError::Invalid(format!(
                "cpu monitor: must specify at least one of {}",
                METRICS.join(", ")
            )));
        }

        let metrics = opts
            .entries()
            .into_iter()
            .filter(|(name, _)| *name != "percent")
            .filter_map(|(name, threshold)| threshold.map(|t| (name, t)))
            .collect();

        Ok(Self { percent: opts.percent, metrics })
    }
}

#[async_trait]
impl Monitor for CpuMonitor {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn monitoring(&self) -> serde_json::Value {
        let mut info = json!({});
        if let Some(percent) = self.percent {
            info["percent"] = json!(format!(">= {percent}%"));
        }
        for (name, threshold) in &self.metrics {
            info[*name] = json!(format!(">= {threshold}%"));
        }
        info
    }

    async fn start(&self, interval: Duration) -> MonitorResult {
        let mut workers = JoinSet::new();
        if let Some(percent) = self.percent {
            workers.spawn(watch_cpu_utilization(percent, interval));
        }
        if !self.metrics.is_empty() {
            workers.spawn(watch_cpu_metrics(self.metrics.clone(), interval));
        }
        first_completed(workers).await
    }
}

/// Snapshot of `/proc/stat` aggregate CPU time, in ticks.
#[derive(Debug, Clone, Copy)]
struct CpuSample {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    steal: u64,
    guest: u64,
    guest_nice: u64,
    irq: u64,
    softirq: u64,
}

impl CpuSample {
    fn read() -> Result<Self, MonitorError> {
        let stats = procfs::KernelStats::current()
            .map_err(|e| MonitorError::Worker(format!("could not read /proc/stat: {e}")))?;
        let t = stats.total;
        Ok(Self {
            user: t.user,
            nice: t.nice,
            system: t.system,
            idle: t.idle,
            iowait: t.iowait.unwrap_or(0),
            steal: t.steal.unwrap_or(0),
            guest: t.guest.unwrap_or(0),
            guest_nice: t.guest_nice.unwrap_or(0),
            irq: t.irq.unwrap_or(0),
            softirq: t.softirq.unwrap_or(0),
        })
    }

    fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.steal
            + self.guest
            + self.guest_nice
            + self.irq
            + self.softirq
    }

    fn field(&self, name: &str) -> u64 {
        match name {
            "user" => self.user,
            "nice" => self.nice,
            "system" => self.system,
            "iowait" => self.iowait,
            "steal" => self.steal,
            "guest" => self.guest,
            "guest_nice" => self.guest_nice,
            _ => 0,
        }
    }
}

/// Percentage of `field` time between two samples, relative to all CPU
/// time elapsed between them.
fn percent_between(prev: &CpuSample, next: &CpuSample, field: &str) -> f64 {
    let total = next.total().saturating_sub(prev.total());
    if total == 0 {
        return 0.0;
    }
    let busy = next.field(field).saturating_sub(prev.field(field));
    (busy as f64 / total as f64 * 10000.0).round() / 100.0
}

/// Overall (non-idle) utilization between two samples.
fn utilization_between(prev: &CpuSample, next: &CpuSample) -> f64 {
    let total = next.total().saturating_sub(prev.total());
    if total == 0 {
        return 0.0;
    }
    let idle = next.idle.saturating_sub(prev.idle) + next.iowait.saturating_sub(prev.iowait);
    let busy = total.saturating_sub(idle);
    (busy as f64 / total as f64 * 10000.0).round() / 100.0
}

async fn watch_cpu_utilization(threshold: f64, interval: Duration) -> MonitorResult {
    // first read only establishes the delta baseline
    let mut prev = CpuSample::read()?;
    loop {
        tokio::time::sleep(interval).await;
        let next = CpuSample::read()?;
        let value = utilization_between(&prev, &next);
        if value > threshold {
            info!("CPU usage at {value}%, exceeding threshold of {threshold}%");
            return Ok(MonitorOutcome::Triggered(format!("cpu usage at {value}%")));
        }
        prev = next;
    }
}

/// All named time-fraction metrics share one worker and one poll cadence.
async fn watch_cpu_metrics(
    metrics: Vec<(&'static str, f64)>,
    interval: Duration,
) -> MonitorResult {
    let mut prev = CpuSample::read()?;
    loop {
        tokio::time::sleep(interval).await;
        let next = CpuSample::read()?;
        for (name, threshold) in &metrics {
            let value = percent_between(&prev, &next, name);
            if value >= *threshold {
                info!("CPU metric {name} is at {value}%, exceeding threshold of {threshold}%");
                return Ok(MonitorOutcome::Triggered(format!("cpu {name} at {value}%")));
            }
        }
        prev = next;
    }
}

#[cfg(test)]
#[path = "cpu_tests.rs"]
mod tests;
