// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch a path's size, or its backing filesystem's utilization.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinSet;
use tracing::{debug, info};

use rig_core::units::format_bytes;
use rig_core::{ConfigError, RigConfig};

use super::{first_completed, Monitor, MonitorError, MonitorOutcome, MonitorResult};
use crate::options::{self, SizeSpec};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilesystemOptions {
    path: PathBuf,
    /// Threshold for the total size of `path` itself
    #[serde(default)]
    size: Option<SizeSpec>,
    /// Threshold for percent of the backing filesystem used
    #[serde(default)]
    used_perc: Option<f64>,
    /// Threshold for absolute bytes used on the backing filesystem
    #[serde(default)]
    used_size: Option<SizeSpec>,
}

#[derive(Debug)]
pub struct FilesystemMonitor {
    path: PathBuf,
    size: Option<(u64, String)>,
    used_perc: Option<f64>,
    used_size: Option<(u64, String)>,
}

impl FilesystemMonitor {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        let opts: FilesystemOptions = options::from_value("monitor", "filesystem", value)?;

        if opts.size.is_none() && opts.used_perc.is_none() && opts.used_size.is_none() {
            return Err(ConfigError::Invalid(
                "filesystem monitor: must specify at least one of 'size', 'used_perc', or \
                 'used_size'"
                    .to_string(),
            ));
        }
        if !opts.path.exists() {
            return Err(ConfigError::invalid(
                "path",
                format!("provided path '{}' does not exist", opts.path.display()),
            ));
        }
        if let Some(perc) = opts.used_perc {
            if !(0.0..=100.0).contains(&perc) {
                return Err(ConfigError::invalid("used_perc", "must be between 0 and 100"));
            }
        }

        let size = opts
            .size
            .map(|s| s.to_bytes().map(|b| (b, s.display())))
            .transpose()?;
        let used_size = opts
            .used_size
            .map(|s| s.to_bytes().map(|b| (b, s.display())))
            .transpose()?;

        Ok(Self { path: opts.path, size, used_perc: opts.used_perc, used_size })
    }
}

#[async_trait]
impl Monitor for FilesystemMonitor {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn monitoring(&self) -> serde_json::Value {
        let mut info = json!({ "path": self.path });
        if let Some((_, display)) = &self.size {
            info["size"] = json!(format!(">= {display}"));
        }
        if let Some(perc) = self.used_perc {
            info["used_perc"] = json!(format!(">= {perc}%"));
        }
        if let Some((_, display)) = &self.used_size {
            info["used_size"] = json!(format!(">= {display}"));
        }
        info
    }

    async fn start(&self, interval: Duration) -> MonitorResult {
        let mut workers = JoinSet::new();
        if let Some((threshold, display)) = &self.size {
            workers.spawn(watch_path_size(
                self.path.clone(),
                *threshold,
                display.clone(),
                interval,
            ));
        }
        if self.used_perc.is_some() || self.used_size.is_some() {
            let used_size = self.used_size.as_ref().map(|(b, _)| *b);
            workers.spawn(watch_fs_used(self.path.clone(), self.used_perc, used_size, interval));
        }
        first_completed(workers).await
    }
}

/// Total on-disk size of a path. Directories are walked recursively and
/// their file sizes summed.
fn path_size(path: &Path) -> std::io::Result<u64> {
    let meta = std::fs::symlink_metadata(path)?;
    if !meta.is_dir() {
        return Ok(meta.len());
    }
    let mut total = 0;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            // entries vanishing mid-walk are not an error
            total += path_size(&entry.path()).unwrap_or(0);
        } else if meta.is_file() {
            total += meta.len();
        }
    }
    Ok(total)
}

async fn watch_path_size(
    path: PathBuf,
    threshold: u64,
    threshold_display: String,
    interval: Duration,
) -> MonitorResult {
    loop {
        let target = path.clone();
        let current = tokio::task::spawn_blocking(move || path_size(&target))
            .await
            .map_err(|e| MonitorError::Worker(e.to_string()))??;
        if current >= threshold {
            info!(
                "Size of path {} is {}, exceeding threshold of {threshold_display}.",
                path.display(),
                format_bytes(current)
            );
            return Ok(MonitorOutcome::Triggered(format!(
                "size of {} reached {}",
                path.display(),
                format_bytes(current)
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

async fn watch_fs_used(
    path: PathBuf,
    used_perc: Option<f64>,
    used_size: Option<u64>,
    interval: Duration,
) -> MonitorResult {
    let stat = nix::sys::statvfs::statvfs(&path)
        .map_err(|e| MonitorError::Worker(format!("statvfs failed: {e}")))?;
    let fs_size = stat.fragment_size() as u64 * stat.blocks() as u64;

    let max_used = match (used_perc, used_size) {
        (Some(perc), _) => (fs_size as f64 * (perc / 100.0)) as u64,
        (None, Some(size)) => size,
        (None, None) => {
            return Err(MonitorError::Worker(
                "filesystem watch requires 'used_perc' or 'used_size'".to_string(),
            ))
        }
    };
    debug!(
        "Determined max allowed used space for {} to be {max_used}B",
        path.display()
    );

    loop {
        let stat = nix::sys::statvfs::statvfs(&path)
            .map_err(|e| MonitorError::Worker(format!("statvfs failed: {e}")))?;
        let free = stat.fragment_size() as u64 * stat.blocks_free() as u64;
        let current_used = fs_size.saturating_sub(free);
        if current_used > max_used {
            let perc = (current_used as f64 / fs_size as f64 * 100.0).round();
            info!(
                "Used space on {} is {} ({perc}%) exceeding threshold of {}.",
                path.display(),
                format_bytes(current_used),
                format_bytes(max_used)
            );
            return Ok(MonitorOutcome::Triggered(format!(
                "used space on {} reached {}",
                path.display(),
                format_bytes(current_used)
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
#[path = "filesystem_tests.rs"]
mod tests;
