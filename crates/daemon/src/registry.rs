// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static registry of the monitor and action types compiled into the
//! binary, indexed by the names rigfiles use.

use rig_core::{ConfigError, RigConfig};

use crate::action::{self, Action};
use crate::monitor::{self, Monitor};

type MonitorBuilder =
    fn(&serde_yaml::Value, &RigConfig) -> Result<Box<dyn Monitor>, ConfigError>;
type ActionBuilder = fn(&serde_yaml::Value, &RigConfig) -> Result<Box<dyn Action>, ConfigError>;

pub struct MonitorKind {
    pub name: &'static str,
    pub description: &'static str,
    build: MonitorBuilder,
}

pub struct ActionKind {
    pub name: &'static str,
    pub description: &'static str,
    build: ActionBuilder,
}

macro_rules! monitor_kind {
    ($name:literal, $desc:literal, $ty:ty) => {
        MonitorKind {
            name: $name,
            description: $desc,
            build: |value, config| {
                <$ty>::configure(value, config).map(|m| Box::new(m) as Box<dyn Monitor>)
            },
        }
    };
}

macro_rules! action_kind {
    ($name:literal, $desc:literal, $ty:ty) => {
        ActionKind {
            name: $name,
            description: $desc,
            build: |value, config| {
                <$ty>::configure(value, config).map(|a| Box::new(a) as Box<dyn Action>)
            },
        }
    };
}

pub const MONITORS: &[MonitorKind] = &[
    monitor_kind!(
        "cpu",
        "Trigger on CPU utilization metrics such as overall use or iowait",
        monitor::cpu::CpuMonitor
    ),
    monitor_kind!(
        "filesystem",
        "Trigger on a path's size or its backing filesystem's utilization",
        monitor::filesystem::FilesystemMonitor
    ),
    monitor_kind!(
        "logs",
        "Trigger when a log file or journal message matches a pattern",
        monitor::log::LogMonitor
    ),
    monitor_kind!(
        "memory",
        "Trigger on system memory usage statistics",
        monitor::memory::MemoryMonitor
    ),
    monitor_kind!(
        "packet",
        "Trigger when a network interface receives traffic matching a specification",
        monitor::packet::PacketMonitor
    ),
    monitor_kind!(
        "process",
        "Trigger on process state changes or resource consumption",
        monitor::process::ProcessMonitor
    ),
    monitor_kind!(
        "system",
        "Trigger on whole-host load average or temperature",
        monitor::system::SystemMonitor
    ),
    monitor_kind!(
        "timer",
        "Trigger after a set amount of time has elapsed",
        monitor::timer::TimerMonitor
    ),
];

pub const ACTIONS: &[ActionKind] = &[
    action_kind!(
        "gcore",
        "Generate an application coredump via gcore",
        action::gcore::GcoreAction
    ),
    action_kind!(
        "kdump",
        "Generate a system vmcore via kdump",
        action::kdump::KdumpAction
    ),
    action_kind!(
        "noop",
        "Do nothing. Used for testing rig configurations",
        action::noop::NoopAction
    ),
    action_kind!(
        "sos",
        "Generate an sos report or collect archive",
        action::sos::SosAction
    ),
    action_kind!(
        "tcpdump",
        "Start a packet capture that ends when the rig is triggered",
        action::tcpdump::TcpdumpAction
    ),
    action_kind!(
        "watch",
        "Periodically record files and command output until the rig triggers",
        action::watch::WatchAction
    ),
];

pub fn find_monitor(name: &str) -> Option<&'static MonitorKind> {
    MONITORS.iter().find(|kind| kind.name == name)
}

pub fn find_action(name: &str) -> Option<&'static ActionKind> {
    ACTIONS.iter().find(|kind| kind.name == name)
}

pub fn build_monitor(
    name: &str,
    value: &serde_yaml::Value,
    config: &RigConfig,
) -> Result<Box<dyn Monitor>, ConfigError> {
    let kind = find_monitor(name).ok_or_else(|| ConfigError::UnknownMonitor(name.to_string()))?;
    (kind.build)(value, config)
}

pub fn build_action(
    name: &str,
    value: &serde_yaml::Value,
    config: &RigConfig,
) -> Result<Box<dyn Action>, ConfigError> {
    let kind = find_action(name).ok_or_else(|| ConfigError::UnknownAction(name.to_string()))?;
    (kind.build)(value, config)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
