// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch log files and/or journald units for a message pattern.
//!
//! One worker tails each existing file; a single additional worker follows
//! the journal for all requested units at once. The journal is read
//! through `journalctl --follow --output json` rather than the C API; the
//! `system` sentinel requests the full journal with no unit filter.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, info};

use rig_core::{ConfigError, RigConfig};

use super::{first_completed, Monitor, MonitorError, MonitorOutcome, MonitorResult};
use crate::options;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogOptions {
    /// Pattern to match, compiled case-insensitive
    message: String,
    #[serde(default, deserialize_with = "options::one_or_many")]
    files: Vec<String>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    journals: Vec<String>,
}

#[derive(Debug)]
pub struct LogMonitor {
    message: Regex,
    files: Vec<PathBuf>,
    /// Unit filters for the journal worker; `None` means watch the full
    /// journal (the `system` sentinel was given)
    journal_units: Option<Vec<String>>,
    watch_journal: bool,
}

impl LogMonitor {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        let opts: LogOptions = options::from_value("monitor", "logs", value)?;

        let message = RegexBuilder::new(&opts.message)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                ConfigError::invalid(
                    "message",
                    format!("pattern '{}' does not compile: {e}", opts.message),
                )
            })?;

        // Non-existent files are dropped, not errors: rigfiles are shared
        // across hosts that do not all have the same logs.
        let files: Vec<PathBuf> = opts
            .files
            .iter()
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .collect();
        for missing in opts.files.iter().filter(|f| !PathBuf::from(f).exists()) {
            debug!("Dropping non-existent log file {missing}");
        }

        let journals: Vec<String> = opts.journals.into_iter().filter(|j| !j.is_empty()).collect();
        let watch_journal = !journals.is_empty();
        let journal_units = if journals.iter().any(|j| j == "system") {
            None
        } else {
            Some(
                journals
                    .into_iter()
                    .map(|unit| {
                        if unit.ends_with(".service") {
                            unit
                        } else {
                            format!("{unit}.service")
                        }
                    })
                    .collect(),
            )
        };

        if files.is_empty() && !watch_journal {
            return Err(ConfigError::Invalid(
                "logs monitor: no existing files or journals specified".to_string(),
            ));
        }

        Ok(Self { message, files, journal_units, watch_journal })
    }
}

#[async_trait]
impl Monitor for LogMonitor {
    fn name(&self) -> &'static str {
        "logs"
    }

    fn monitoring(&self) -> serde_json::Value {
        json!({
            "message": self.message.as_str(),
            "files": self.files,
            "journals": match &self.journal_units {
                _ if !self.watch_journal => json!([]),
                None => json!(["system"]),
                Some(units) => json!(units),
            },
        })
    }

    async fn start(&self, interval: Duration) -> MonitorResult {
        let mut workers = JoinSet::new();
        for file in &self.files {
            let file = file.clone();
            let message = self.message.clone();
            workers.spawn(watch_file(file, message, interval));
        }
        if self.watch_journal {
            let units = self.journal_units.clone();
            let message = self.message.clone();
            workers.spawn(watch_journal(units, message));
        }
        first_completed(workers).await
    }
}

/// Tail one file from its current end, matching each appended line.
async fn watch_file(path: PathBuf, message: Regex, interval: Duration) -> MonitorResult {
    info!("Beginning watch of file {}", path.display());
    let file = tokio::fs::File::open(&path).await?;
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::End(0)).await?;

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            tokio::time::sleep(interval).await;
            continue;
        }
        // log files are not guaranteed to be clean UTF-8
        let line = String::from_utf8_lossy(&buf);
        if message.is_match(line.trim()) {
            info!(
                "Logged message in {} matches pattern '{}'",
                path.display(),
                message.as_str()
            );
            return Ok(MonitorOutcome::Triggered(format!(
                "message in {} matched pattern '{}'",
                path.display(),
                message.as_str()
            )));
        }
    }
}

/// Follow the journal, matching the MESSAGE field of each new record.
/// All requested units share this single worker.
async fn watch_journal(units: Option<Vec<String>>, message: Regex) -> MonitorResult {
    let mut cmd = tokio::process::Command::new("journalctl");
    cmd.args(["--follow", "--lines", "0", "--output", "json"]);
    match &units {
        None => info!("Beginning watch of the full journal"),
        Some(units) => {
            for unit in units {
                cmd.args(["-u", unit]);
            }
            info!("Beginning watch of journal(s): {units:?}");
        }
    }
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| MonitorError::Worker(format!("could not start journalctl: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MonitorError::Worker("journalctl stdout unavailable".to_string()))?;
    let mut lines = BufReader::new(stdout).lines();

    while let Some(line) = lines.next_line().await? {
        let Ok(record) = serde_json::from_str::<serde_json::Value>(&line) else {
            continue;
        };
        let Some(entry) = record.get("MESSAGE").and_then(|m| m.as_str()) else {
            continue;
        };
        if message.is_match(entry.trim()) {
            info!("Logged message in journal matches pattern '{}'", message.as_str());
            return Ok(MonitorOutcome::Triggered(format!(
                "journal message matched pattern '{}'",
                message.as_str()
            )));
        }
    }
    Err(MonitorError::Worker("journalctl stream ended unexpectedly".to_string()))
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
