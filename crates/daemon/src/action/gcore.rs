// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collect application core dumps via the gcore utility from GDB.
//!
//! Processes may be given as PIDs or command patterns; patterns resolve
//! to every matching PID at configure time. With `freeze: true` each
//! process is stopped with SIGSTOP before the dump and continued with
//! SIGCONT afterwards. Repeatable, so successive dumps of the same
//! process can be compared.

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use rig_core::proc::{pid_exists, resolve_pids};
use rig_core::{ConfigError, RigConfig, SubprocessError};

use super::exec::{run_command, SUBPROCESS_TIMEOUT};
use super::{check_binary, Action, ActionCtx, ActionError};
use crate::options::{self, NameOrNumber};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GcoreOptions {
    #[serde(deserialize_with = "options::one_or_many")]
    procs: Vec<NameOrNumber>,
    /// SIGSTOP before dumping, SIGCONT after
    #[serde(default)]
    freeze: bool,
}

#[derive(Debug)]
pub struct GcoreAction {
    /// proc spec as written -> resolved PIDs. A literal PID maps to
    /// itself; a name may fan out to several PIDs.
    procs: Vec<(String, Vec<i32>)>,
    freeze: bool,
}

impl GcoreAction {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        check_binary("gcore")?;
        let opts: GcoreOptions = options::from_value("action", "gcore", value)?;

        let mut procs = Vec::new();
        for spec in opts.procs {
            let spec = spec.into_string();
            let pids = resolve_pids(&[spec.clone()])?;
            if !pids.is_empty() {
                procs.push((spec, pids));
            }
        }
        if procs.is_empty() {
            return Err(ConfigError::Invalid(
                "gcore action: no PIDs found matching specified procs".to_string(),
            ));
        }

        let all: Vec<String> = procs
            .iter()
            .flat_map(|(_, pids)| pids.iter().map(|p| p.to_string()))
            .collect();
        debug!(
            "PID list for generating core dumps determined to be: {}",
            all.join(", ")
        );

        Ok(Self { procs, freeze: opts.freeze })
    }

    fn freeze_pid(&self, pid: i32) -> bool {
        info!("Freezing pid {pid}");
        match kill(Pid::from_raw(pid), Signal::SIGSTOP) {
            Ok(()) => true,
            Err(err) => {
                error!("Could not send SIGSTOP to {pid}: {err}");
                false
            }
        }
    }

    fn thaw_pid(&self, pid: i32) {
        info!("Thawing pid {pid}");
        if let Err(err) = kill(Pid::from_raw(pid), Signal::SIGCONT) {
            error!("Could not send SIGCONT to {pid}: {err}");
        }
    }

    async fn collect_coredump(
        &self,
        pid: i32,
        prefix: &std::path::Path,
        ctx: &mut ActionCtx,
    ) -> Result<(), ActionError> {
        // gcore appends .<pid> to the -o prefix
        let expected = prefix.with_file_name(format!(
            "{}.{pid}",
            prefix.file_name().map(|f| f.to_string_lossy()).unwrap_or_default()
        ));

        let frozen = self.freeze && self.freeze_pid(pid);

        debug!("Collecting coredump of {pid} at {}", expected.display());
        let result = run_command(
            &format!("gcore -o {} {pid}", prefix.display()),
            SUBPROCESS_TIMEOUT,
        )
        .await;

        let outcome = match result {
            Ok(ret) => {
                if expected.is_file() {
                    ctx.add_archive_file(&expected);
                } else {
                    // some gcore builds report the actual output path on
                    // the penultimate stdout line
                    info!(
                        "Coredump not generated at expected location, attempting to determine \
                         core filename"
                    );
                    let reported = ret
                        .stdout
                        .lines()
                        .rev()
                        .nth(1)
                        .and_then(|line| line.split_whitespace().last())
                        .map(std::path::PathBuf::from);
                    match reported {
                        Some(path) if path.is_file() => {
                            info!("Coredump {} found. Adding to archive", path.display());
                            ctx.add_archive_file(&path);
                        }
                        _ => error!(
                            "Coredump not generated at expected location, and could not \
                             determine an alternative location"
                        ),
                    }
                }
                Ok(())
            }
            // a failed dump for one pid does not abort the rest
            Err(SubprocessError::Failed { stdout, stderr, .. }) => {
                error!("Error collecting coredump via gcore. See debug logs for details");
                debug!("gcore output: {stdout}{stderr}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        };

        if frozen {
            self.thaw_pid(pid);
        }
        outcome
    }
}

#[async_trait]
impl Action for GcoreAction {
    fn name(&self) -> &'static str {
        "gcore"
    }

    fn priority(&self) -> i32 {
        1
    }

    fn repeatable(&self) -> bool {
        true
    }

    fn produces(&self) -> serde_json::Value {
        let names: Vec<String> = self
            .procs
            .iter()
            .map(|(spec, _)| format!("core-<repeat>.{spec}.<pid>"))
            .collect();
        json!(names)
    }

    async fn trigger(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        let procs = self.procs.clone();
        for (spec, pids) in &procs {
            for pid in pids {
                // re-verify liveness right before dumping; the trigger
                // condition may be the process dying
                if !pid_exists(*pid) {
                    error!(
                        "Cannot collect coredump for pid {pid} - process no longer exists"
                    );
                    continue;
                }
                let prefix = if *spec == pid.to_string() {
                    ctx.tmpdir.join(format!("core-{}", ctx.repeat_count))
                } else {
                    ctx.tmpdir.join(format!("core-{}.{spec}", ctx.repeat_count))
                };
                self.collect_coredump(*pid, &prefix, ctx).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "gcore_tests.rs"]
mod tests;
