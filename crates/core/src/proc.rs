// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process lookup helpers.
//!
//! Rigfiles may name processes by PID or by command pattern; everything
//! downstream works on PIDs, so resolution happens once at configure time.

use std::path::Path;

use regex::Regex;

use crate::error::ConfigError;

/// POSIX process states a rig can watch for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Running,
    Sleeping,
    DiskSleep,
    Stopped,
    Zombie,
}

impl ProcState {
    /// Parse the aliases accepted in rigfiles. A leading `!` must be
    /// stripped by the caller.
    pub fn parse(state: &str) -> Result<ProcState, ConfigError> {
        match state {
            "running" | "run" | "R" => Ok(ProcState::Running),
            "sleeping" | "sleep" | "S" => Ok(ProcState::Sleeping),
            "disk-sleep" | "disk_sleep" | "D" | "UN" | "uninterruptible"
            | "uninterruptible_sleep" => Ok(ProcState::DiskSleep),
            "stopped" | "stop" | "T" => Ok(ProcState::Stopped),
            "zombie" | "Z" => Ok(ProcState::Zombie),
            other => Err(ConfigError::invalid(
                "state",
                format!("unable to parse process state '{other}'"),
            )),
        }
    }

    /// Map the single-character state from `/proc/<pid>/stat`.
    pub fn from_stat_char(c: char) -> Option<ProcState> {
        match c {
            'R' => Some(ProcState::Running),
            'S' => Some(ProcState::Sleeping),
            'D' => Some(ProcState::DiskSleep),
            'T' | 't' => Some(ProcState::Stopped),
            'Z' => Some(ProcState::Zombie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcState::Running => "running",
            ProcState::Sleeping => "sleeping",
            ProcState::DiskSleep => "disk-sleep",
            ProcState::Stopped => "stopped",
            ProcState::Zombie => "zombie",
        }
    }
}

/// Whether a PID currently exists.
pub fn pid_exists(pid: i32) -> bool {
    procfs::process::Process::new(pid).is_ok()
}

/// Resolve a list of process identifiers to live PIDs.
///
/// Each entry is either a literal PID or a regex matched against the
/// process comm, executable basename, and argv[0] basename. The result is
/// deduplicated and sorted; unmatched patterns simply contribute nothing.
pub fn resolve_pids(procs: &[String]) -> Result<Vec<i32>, ConfigError> {
    let mut pids: Vec<i32> = Vec::new();
    let mut patterns: Vec<Regex> = Vec::new();

    for spec in procs {
        let spec = spec.trim();
        if spec.is_empty() {
            continue;
        }
        if let Ok(pid) = spec.parse::<i32>() {
            if pid_exists(pid) {
                pids.push(pid);
            }
            continue;
        }
        let re = Regex::new(spec).map_err(|e| {
            ConfigError::invalid("procs", format!("'{spec}' is not a valid pattern: {e}"))
        })?;
        patterns.push(re);
    }

    if !patterns.is_empty() {
        let all = procfs::process::all_processes().map_err(|e| {
            ConfigError::invalid("procs", format!("could not scan /proc: {e}"))
        })?;
        for proc in all.flatten() {
            let mut names: Vec<String> = Vec::new();
            if let Ok(stat) = proc.stat() {
                names.push(stat.comm);
            }
            if let Ok(exe) = proc.exe() {
                if let Some(base) = exe.file_name() {
                    names.push(base.to_string_lossy().into_owned());
                }
            }
            if let Ok(cmdline) = proc.cmdline() {
                if let Some(argv0) = cmdline.first() {
                    let base = Path::new(argv0)
                        .file_name()
                        .map(|f| f.to_string_lossy().into_owned())
                        .unwrap_or_else(|| argv0.clone());
                    names.push(base);
                }
            }
            if patterns.iter().any(|re| names.iter().any(|n| re.is_match(n))) {
                pids.push(proc.pid());
            }
        }
    }

    pids.sort_unstable();
    pids.dedup();
    Ok(pids)
}

#[cfg(test)]
#[path = "proc_tests.rs"]
mod tests;
