// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch processes for state changes or resource consumption.
//!
//! Processes may be named by PID or by command pattern; resolution to
//! PIDs happens once at configure time. Each PID gets its own state
//! worker and/or utilization worker. A watched PID that disappears while
//! the watch is not `!running` parks its worker; once every watched PID
//! is gone the monitor cancels the rig rather than triggering it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use procfs::Current;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinSet;
use tracing::{debug, info};

use rig_core::proc::{pid_exists, resolve_pids, ProcState};
use rig_core::units::format_bytes;
use rig_core::{ConfigError, RigConfig};

use super::{first_completed, Monitor, MonitorError, MonitorOutcome, MonitorResult};
use crate::options::{self, NameOrNumber, SizeSpec};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProcessOptions {
    #[serde(deserialize_with = "options::one_or_many")]
    procs: Vec<NameOrNumber>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    cpu_percent: Option<f64>,
    #[serde(default)]
    memory_percent: Option<f64>,
    #[serde(default)]
    vms: Option<SizeSpec>,
    #[serde(default)]
    rss: Option<SizeSpec>,
}

/// Thresholds shared by every utilization worker.
#[derive(Debug, Clone, Copy, Default)]
struct Utilization {
    cpu_percent: Option<f64>,
    memory_percent: Option<f64>,
    vms: Option<u64>,
    rss: Option<u64>,
}

impl Utilization {
    fn any(&self) -> bool {
        self.cpu_percent.is_some()
            || self.memory_percent.is_some()
            || self.vms.is_some()
            || self.rss.is_some()
    }
}

/// Shared liveness view for the park-until-all-dead rule.
#[derive(Debug)]
struct PidSet {
    pids: Vec<i32>,
    /// Serializes the all-dead poll across parked workers. Async so a
    /// parked worker waiting its turn yields to the scheduler instead of
    /// blocking the runtime thread.
    guard: tokio::sync::Mutex<()>,
}

impl PidSet {
    fn all_dead(&self) -> bool {
        self.pids.iter().all(|p| !pid_exists(*p))
    }
}

#[derive(Debug)]
pub struct ProcessMonitor {
    pids: Arc<PidSet>,
    state: Option<ProcState>,
    invert_state: bool,
    utilization: Utilization,
}

impl ProcessMonitor {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        let opts: ProcessOptions = options::from_value("monitor", "process", value)?;

        let (state, invert_state) = match &opts.state {
            Some(raw) => {
                let invert = raw.starts_with('!');
                (Some(ProcState::parse(raw.trim_start_matches('!'))?), invert)
            }
            None => (None, false),
        };

        let utilization = Utilization {
            cpu_percent: opts.cpu_percent,
            memory_percent: opts.memory_percent,
            vms: opts.vms.map(|s| s.to_bytes()).transpose()?,
            rss: opts.rss.map(|s| s.to_bytes()).transpose()?,
        };

        if state.is_none() && !utilization.any() {
            return Err(ConfigError::Invalid(
                "process monitor: must specify at least one of state, cpu_percent, \
                 memory_percent, vms, rss"
                    .to_string(),
            ));
        }

        let specs: Vec<String> = opts.procs.into_iter().map(NameOrNumber::into_string).collect();
        let pids = resolve_pids(&specs)?;
        if pids.is_empty() {
            return Err(ConfigError::Invalid(
                "process monitor: no PIDs matching specified process identifiers found"
                    .to_string(),
            ));
        }

        Ok(Self {
            pids: Arc::new(PidSet { pids, guard: tokio::sync::Mutex::new(()) }),
            state,
            invert_state,
            utilization,
        })
    }
}

#[async_trait]
impl Monitor for ProcessMonitor {
    fn name(&self) -> &'static str {
        "process"
    }

    fn monitoring(&self) -> serde_json::Value {
        let mut info = json!({ "pids": self.pids.pids });
        if let Some(state) = self.state {
            let invert = if self.invert_state { "not " } else { "" };
            info["state"] = json!(format!("{invert}{}", state.as_str()));
        }
        if let Some(v) = self.utilization.cpu_percent {
            info["cpu_percent"] = json!(format!(">= {v}%"));
        }
        if let Some(v) = self.utilization.memory_percent {
            info["memory_percent"] = json!(format!(">= {v}%"));
        }
        if let Some(v) = self.utilization.vms {
            info["vms"] = json!(format!(">= {}", format_bytes(v)));
        }
        if let Some(v) = self.utilization.rss {
            info["rss"] = json!(format!(">= {}", format_bytes(v)));
        }
        info
    }

    async fn start(&self, interval: Duration) -> MonitorResult {
        let mut workers = JoinSet::new();
        for pid in &self.pids.pids {
            if let Some(state) = self.state {
                workers.spawn(watch_state(
                    *pid,
                    state,
                    self.invert_state,
                    Arc::clone(&self.pids),
                    interval,
                ));
            }
            if self.utilization.any() {
                workers.spawn(watch_utilization(
                    *pid,
                    self.utilization,
                    Arc::clone(&self.pids),
                    interval,
                ));
            }
        }
        first_completed(workers).await
    }
}

fn current_state(pid: i32) -> Option<ProcState> {
    let stat = procfs::process::Process::new(pid).ok()?.stat().ok()?;
    ProcState::from_stat_char(stat.state)
}

/// Watch one PID for the configured state.
///
/// Inverted watches (`!state`) trigger on the first sample in any other
/// state, with one carve-out: `!running` does not treat `sleeping` as a
/// match, since sleeping is the ordinary condition of a healthy process.
async fn watch_state(
    pid: i32,
    state: ProcState,
    invert: bool,
    pids: Arc<PidSet>,
    interval: Duration,
) -> MonitorResult {
    debug!(
        "Launching monitor worker for PID {pid} in state {}{}",
        if invert { "not " } else { "" },
        state.as_str()
    );
    loop {
        let Some(current) = current_state(pid) else {
            if state == ProcState::Running && invert {
                info!("Process {pid} no longer exists, matching trigger state of !running.");
                return Ok(MonitorOutcome::Triggered(format!(
                    "process {pid} no longer exists (!running)"
                )));
            }
            info!(
                "Process {pid} no longer exists, and desired trigger state is not '!running'. \
                 Holding monitor active until all pid monitoring is resolved."
            );
            return hold_until_all_dead(pid, pids, interval).await;
        };

        let exempt = state == ProcState::Running && current == ProcState::Sleeping && invert;
        let matched = (current == state) != invert;
        if !exempt && matched {
            info!(
                "Process {pid} is in state {} matching trigger state '{}{}'",
                current.as_str(),
                if invert { "!" } else { "" },
                state.as_str()
            );
            return Ok(MonitorOutcome::Triggered(format!(
                "process {pid} in state {}",
                current.as_str()
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

/// Park a worker whose PID died without matching. When every watched PID
/// is dead the rig is cancelled, never triggered.
async fn hold_until_all_dead(pid: i32, pids: Arc<PidSet>, interval: Duration) -> MonitorResult {
    debug!(
        "Process {pid} no longer exists. Holding monitor worker until all specified pids either \
         die or trigger rig."
    );
    loop {
        // the guard covers only the check; it is released before sleeping
        {
            let _guard = pids.guard.lock().await;
            if pids.all_dead() {
                break;
            }
        }
        tokio::time::sleep(interval).await;
    }
    Ok(MonitorOutcome::Cancelled(
        "all specified pids now dead, and state not defined to trigger on this condition"
            .to_string(),
    ))
}

/// Watch one PID's resource usage against every configured threshold.
async fn watch_utilization(
    pid: i32,
    limits: Utilization,
    pids: Arc<PidSet>,
    interval: Duration,
) -> MonitorResult {
    debug!("Launching utilization monitor worker for PID {pid}");
    let tps = procfs::ticks_per_second();
    let page_size = procfs::page_size();

    // establishment read; cpu_percent needs a delta baseline
    let mut last_ticks = match proc_ticks(pid) {
        Some(t) => t,
        None => return hold_until_all_dead(pid, pids, interval).await,
    };

    loop {
        tokio::time::sleep(interval).await;
        let Ok(proc) = procfs::process::Process::new(pid) else {
            return hold_until_all_dead(pid, pids, interval).await;
        };
        let Ok(stat) = proc.stat() else {
            return hold_until_all_dead(pid, pids, interval).await;
        };

        if let Some(limit) = limits.cpu_percent {
            let ticks = stat.utime + stat.stime;
            let delta = ticks.saturating_sub(last_ticks);
            last_ticks = ticks;
            let percent = (delta as f64 / tps as f64) / interval.as_secs_f64() * 100.0;
            let percent = (percent * 100.0).round() / 100.0;
            if percent > limit {
                info!(
                    "Process {pid} cpu_percent usage of {percent}% exceeds threshold of {limit}%"
                );
                return Ok(MonitorOutcome::Triggered(format!(
                    "process {pid} cpu usage at {percent}%"
                )));
            }
        }
        if let Some(limit) = limits.memory_percent {
            let total = procfs::Meminfo::current()
                .map_err(|e| MonitorError::Worker(e.to_string()))?
                .mem_total;
            let rss = (stat.rss as u64).saturating_mul(page_size);
            let percent = ((rss as f64 / total as f64 * 100.0) * 100.0).round() / 100.0;
            if percent > limit {
                info!(
                    "Process {pid} memory_percent usage of {percent}% exceeds threshold of \
                     {limit}%"
                );
                return Ok(MonitorOutcome::Triggered(format!(
                    "process {pid} memory usage at {percent}%"
                )));
            }
        }
        if let Some(limit) = limits.vms {
            if stat.vsize > limit {
                info!(
                    "Process {pid} vms usage of {} exceeds threshold of {}",
                    format_bytes(stat.vsize),
                    format_bytes(limit)
                );
                return Ok(MonitorOutcome::Triggered(format!(
                    "process {pid} vms at {}",
                    format_bytes(stat.vsize)
                )));
            }
        }
        if let Some(limit) = limits.rss {
            let rss = (stat.rss as u64).saturating_mul(page_size);
            if rss > limit {
                info!(
                    "Process {pid} rss usage of {} exceeds threshold of {}",
                    format_bytes(rss),
                    format_bytes(limit)
                );
                return Ok(MonitorOutcome::Triggered(format!(
                    "process {pid} rss at {}",
                    format_bytes(rss)
                )));
            }
        }
    }
}

fn proc_ticks(pid: i32) -> Option<u64> {
    let stat = procfs::process::Process::new(pid).ok()?.stat().ok()?;
    Some(stat.utime + stat.stime)
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
