// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run a packet capture for the life of the rig.
//!
//! The capture starts in `pre_action` and ends when the rig triggers, so
//! the pcap covers the window leading up to the event. The spawned
//! tcpdump is given one second to fail fast; anything it prints to
//! stderr and exits with in that window (a malformed filter expression,
//! a bad interface) stops the rig from starting.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::{debug, error};

use rig_core::{ConfigError, RigConfig};

use super::{check_binary, Action, ActionCtx, ActionError};
use crate::options;

// -Z root avoids the privilege drop that happens before opening the
// first savefile, which would fail the rig with ENOPERM
const TCPDUMP_FIXED_ARGS: &[&str] = &["-Z", "root", "-n"];

fn default_capture_size() -> u64 {
    10
}

fn default_capture_count() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TcpdumpOptions {
    interface: String,
    /// Maximum size of each capture file in MB
    #[serde(default = "default_capture_size")]
    capture_size: u64,
    /// Number of rotated capture files to keep
    #[serde(default = "default_capture_count")]
    capture_count: u32,
    /// Bytes of each packet to keep; 0 captures whole packets
    #[serde(default)]
    snapshot_length: u32,
    /// libpcap filter expression
    #[serde(default)]
    expression: Option<String>,
}

#[derive(Debug)]
pub struct TcpdumpAction {
    interface: String,
    capture_size: u64,
    capture_count: u32,
    snapshot_length: u32,
    expression: Option<String>,
    capture: Option<tokio::process::Child>,
    /// Stem of the capture file(s) inside tmpdir
    capture_base: Option<String>,
}

impl TcpdumpAction {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        check_binary("tcpdump")?;
        let opts: TcpdumpOptions = options::from_value("action", "tcpdump", value)?;

        nix::net::if_::if_nametoindex(opts.interface.as_str()).map_err(|_| {
            ConfigError::invalid(
                "interface",
                format!("interface '{}' does not exist", opts.interface),
            )
        })?;

        Ok(Self {
            interface: opts.interface,
            capture_size: opts.capture_size,
            capture_count: opts.capture_count,
            snapshot_length: opts.snapshot_length,
            expression: opts.expression,
            capture: None,
            capture_base: None,
        })
    }

    fn stop_capture(&mut self) {
        let Some(mut child) = self.capture.take() else {
            return;
        };
        // SIGTERM first so tcpdump flushes its savefile
        if let Some(pid) = child.id() {
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
        tokio::spawn(async move {
            let grace = tokio::time::timeout(Duration::from_secs(5), child.wait()).await;
            if grace.is_err() {
                let _ = child.start_kill();
            }
        });
    }
}

fn hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .map(|h| h.trim().to_string())
        .unwrap_or_else(|_| "localhost".to_string())
}

#[async_trait]
impl Action for TcpdumpAction {
    fn name(&self) -> &'static str {
        "tcpdump"
    }

    fn priority(&self) -> i32 {
        2
    }

    fn produces(&self) -> serde_json::Value {
        json!(format!(
            "A packet capture from interface {} using filter '{}'",
            self.interface,
            self.expression.as_deref().unwrap_or("")
        ))
    }

    async fn pre_action(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        let date = chrono::Utc::now().format("%d-%m-%Y-%H%M%S");
        let base = format!("{}-{date}-{}.pcap", hostname(), self.interface);
        let path = ctx.tmpdir.join(&base);

        let mut cmd = tokio::process::Command::new("tcpdump");
        cmd.args(TCPDUMP_FIXED_ARGS)
            .args(["-s", &self.snapshot_length.to_string()])
            .args(["-i", &self.interface])
            .args(["-C", &self.capture_size.to_string()])
            .args(["-W", &self.capture_count.to_string()])
            .arg("-w")
            .arg(&path);
        if let Some(expression) = &self.expression {
            cmd.arg(expression);
        }
        debug!("Running tcpdump as {cmd:?}");

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ActionError::Failed(format!("could not start tcpdump: {e}")))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ActionError::Failed("tcpdump stderr unavailable".to_string()))?;

        // an exit within the first second means tcpdump rejected its
        // arguments; surface its stderr as the configuration error
        match tokio::time::timeout(Duration::from_secs(1), child.wait()).await {
            Ok(status) => {
                let mut message = String::new();
                let _ = stderr.read_to_string(&mut message).await;
                let _ = status;
                return Err(ActionError::Config(ConfigError::Invalid(format!(
                    "tcpdump with expression '{}' failed to start: {}",
                    self.expression.as_deref().unwrap_or(""),
                    message.trim()
                ))));
            }
            Err(_) => {
                // still running; keep the pipe drained so tcpdump can
                // never block on a full stderr buffer
                tokio::spawn(async move {
                    let _ = tokio::io::copy(&mut stderr, &mut tokio::io::sink()).await;
                });
            }
        }

        debug!("Started background tcpdump on interface '{}'", self.interface);
        self.capture = Some(child);
        self.capture_base = Some(base);
        Ok(())
    }

    async fn trigger(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        debug!("Stopping tcpdump");
        self.stop_capture();
        // give the capture a moment to flush before collecting files
        tokio::time::sleep(Duration::from_millis(500)).await;

        let Some(base) = self.capture_base.clone() else {
            return Err(ActionError::Failed("tcpdump was never started".to_string()));
        };
        let mut found: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(&ctx.tmpdir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(&base) {
                found.push(entry.path());
            }
        }
        if found.is_empty() {
            error!("No capture files found for {base}");
        }
        found.sort();
        for file in found {
            ctx.add_archive_file(&file);
        }
        Ok(())
    }

    async fn cleanup(&mut self, _ctx: &mut ActionCtx) -> Result<(), ActionError> {
        self.stop_capture();
        Ok(())
    }
}

#[cfg(test)]
#[path = "tcpdump_tests.rs"]
mod tests;
