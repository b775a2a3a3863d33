// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record files and command output periodically for the life of the rig.
//!
//! One background sampler per watched file and per command writes
//! timestamp-delimited blocks into the scratch directory every interval,
//! starting immediately so the first sample reflects rig start rather
//! than one interval later. `use_standard_set` pulls in the customary
//! networking diagnostic files and commands, probing each for presence
//! before inclusion.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rig_core::{ConfigError, RigConfig, SubprocessError};

use super::exec::{run_command, split_command};
use super::{check_binary, Action, ActionCtx, ActionError};
use crate::options;

const STANDARD_FILES: &[(&str, &str)] = &[
    ("/proc/interrupts", "interrupts"),
    ("/proc/vmstat", "vmstat"),
    ("/proc/net/softnet_stat", "softnet_stat"),
    ("/proc/softirqs", "softirqs"),
    ("/proc/net/sockstat", "sockstat"),
    ("/proc/net/sockstat6", "sockstat6"),
    ("/proc/net/dev", "netdev"),
    ("/proc/net/sctp/assocs", "sctp_assocs"),
    ("/proc/net/sctp/snmp", "sctp_snmp"),
];

const STANDARD_COMMANDS: &[&str] = &[
    "netstat -s",
    "nstat -az",
    "ss -noemitaup",
    "ps -alfe",
    "top -c -b -n 1",
    "numastat",
    "ip neigh show",
    "tc -s qdisc",
];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WatchFile {
    path: String,
    /// Destination filename within the archive; defaults to the source
    /// basename
    #[serde(default)]
    dest: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WatchOptions {
    #[serde(default)]
    files: Vec<WatchFile>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    commands: Vec<String>,
    #[serde(default)]
    use_standard_set: bool,
}

#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Command(String),
}

#[derive(Debug, Clone)]
struct SamplerSpec {
    source: Source,
    outfile: String,
}

#[derive(Debug)]
pub struct WatchAction {
    specs: Vec<SamplerSpec>,
    stop: CancellationToken,
    samplers: Vec<(String, JoinHandle<()>)>,
}

fn command_outfile(cmd: &str) -> String {
    cmd.replace(' ', "_").replace('/', ".").trim_start_matches('.').to_string()
}

fn command_available(cmd: &str) -> bool {
    match split_command(cmd).first() {
        Some(binary) => {
            check_binary(binary).is_ok() || std::path::Path::new(binary).exists()
        }
        None => false,
    }
}

impl WatchAction {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        let opts: WatchOptions = options::from_value("action", "watch", value)?;
        let mut specs = Vec::new();

        for file in &opts.files {
            let dest = match &file.dest {
                Some(dest) => dest.replace('/', "_"),
                None => std::path::Path::new(&file.path)
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        ConfigError::invalid("files", format!("'{}' has no filename", file.path))
                    })?,
            };
            specs.push(SamplerSpec {
                source: Source::File(PathBuf::from(&file.path)),
                outfile: dest,
            });
        }

        for cmd in &opts.commands {
            if !command_available(cmd) {
                return Err(ConfigError::Invalid(format!(
                    "watch action: cannot watch command '{cmd}': command not found"
                )));
            }
            specs.push(SamplerSpec {
                source: Source::Command(cmd.clone()),
                outfile: command_outfile(cmd),
            });
        }

        if opts.use_standard_set {
            debug!("Standard set requested, adding probed files and commands");
            specs.extend(standard_set());
        }

        if specs.is_empty() {
            return Err(ConfigError::Invalid(
                "watch action: no valid files or commands to watch provided".to_string(),
            ));
        }

        Ok(Self { specs, stop: CancellationToken::new(), samplers: Vec::new() })
    }
}

/// The standard diagnostic set, filtered to what this host can provide.
fn standard_set() -> Vec<SamplerSpec> {
    let mut specs = Vec::new();
    for (path, dest) in STANDARD_FILES {
        if std::path::Path::new(path).exists() {
            specs.push(SamplerSpec {
                source: Source::File(PathBuf::from(path)),
                outfile: (*dest).to_string(),
            });
        }
    }
    let mut commands: Vec<String> = Vec::new();
    for cmd in STANDARD_COMMANDS {
        if command_available(cmd) {
            commands.push((*cmd).to_string());
        } else {
            debug!("Command '{cmd}' not found locally, skipping from standard set");
        }
    }
    // one class-stats watcher per mq qdisc device
    if command_available("tc") {
        if let Ok(output) = std::process::Command::new("tc").args(["qdisc", "show"]).output() {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                if !line.contains("qdisc mq") {
                    continue;
                }
                if let Some(dev) =
                    line.split("dev").nth(1).and_then(|rest| rest.split_whitespace().next())
                {
                    commands.push(format!("tc -s class show dev {dev}"));
                }
            }
        }
    }
    for cmd in commands {
        specs.push(SamplerSpec { outfile: command_outfile(&cmd), source: Source::Command(cmd) });
    }
    specs
}

async fn append_sample(path: &std::path::Path, content: &str) {
    let stamped = format!("==== {} ====\n{content}\n", chrono::Local::now());
    let result = async {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(stamped.as_bytes()).await
    }
    .await;
    if let Err(err) = result {
        warn!("Unable to write sample to {}: {err}", path.display());
    }
}

/// One sampler's life: sample immediately, then every interval until
/// stopped. Task completion is the stop acknowledgement the trigger
/// waits on.
async fn run_sampler(
    spec: SamplerSpec,
    outpath: PathBuf,
    interval: Duration,
    stop: CancellationToken,
) {
    loop {
        let content = match &spec.source {
            Source::File(src) => tokio::fs::read_to_string(src)
                .await
                .unwrap_or_else(|err| format!("Unable to copy contents of {}: {err}", src.display())),
            Source::Command(cmd) => {
                // never sample longer than the sampling interval
                let timeout = Duration::from_secs((interval.as_secs() / 2).max(1));
                match run_command(cmd, timeout).await {
                    Ok(out) if out.stderr.is_empty() => out.stdout,
                    Ok(out) => format!("{}{}", out.stdout, out.stderr),
                    // a failing command's output is still worth recording
                    Err(SubprocessError::Failed { stdout, stderr, .. }) => {
                        format!("{stdout}{stderr}")
                    }
                    Err(err) => format!("Could not collect command output: {err}"),
                }
            }
        };
        append_sample(&outpath, &content).await;

        tokio::select! {
            _ = stop.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[async_trait]
impl Action for WatchAction {
    fn name(&self) -> &'static str {
        "watch"
    }

    fn produces(&self) -> serde_json::Value {
        let outputs: Vec<&str> = self.specs.iter().map(|s| s.outfile.as_str()).collect();
        json!(outputs)
    }

    async fn pre_action(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        for spec in &self.specs {
            debug!("Starting '{}' periodic collector", spec.outfile);
            let outpath = ctx.tmpdir.join(&spec.outfile);
            let handle = tokio::spawn(run_sampler(
                spec.clone(),
                outpath,
                ctx.interval(),
                self.stop.child_token(),
            ));
            self.samplers.push((spec.outfile.clone(), handle));
        }
        Ok(())
    }

    async fn trigger(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        self.stop.cancel();
        for (name, handle) in self.samplers.drain(..) {
            let deadline = ctx.interval() + Duration::from_secs(5);
            match tokio::time::timeout(deadline, handle).await {
                Ok(_) => {}
                Err(_) => info!("Collector {name} did not acknowledge stop in time"),
            }
        }
        for spec in &self.specs {
            let outpath = ctx.tmpdir.join(&spec.outfile);
            if outpath.exists() {
                ctx.add_archive_file(&outpath);
            }
        }
        Ok(())
    }

    async fn cleanup(&mut self, _ctx: &mut ActionCtx) -> Result<(), ActionError> {
        self.stop.cancel();
        Ok(())
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
