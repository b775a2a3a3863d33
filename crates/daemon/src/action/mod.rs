// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action framework.
//!
//! Actions are the collections a rig performs once triggered. Unlike
//! monitors they run serially, in ascending priority order, from the rig
//! core. Four lifecycle hooks: `pre_action` before monitoring begins
//! (background captures start there), `trigger` on the trigger event,
//! `post_action` after a successful trigger, and `cleanup` which always
//! runs once the action has been triggered, success or not.

pub mod exec;
pub mod gcore;
pub mod kdump;
pub mod noop;
pub mod sos;
pub mod tcpdump;
pub mod watch;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use rig_core::{ConfigError, RigConfig, SubprocessError};

/// A failure inside an action. Failures in `trigger` are logged and the
/// rig continues with its remaining actions; failures in `pre_action`
/// are fatal to the whole rig.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Subprocess(#[from] SubprocessError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

/// Working state handed to every action hook: the rig options, the rig's
/// scratch directory, the current repeat iteration, and the list of files
/// registered for the archive so far.
pub struct ActionCtx {
    pub config: RigConfig,
    pub tmpdir: PathBuf,
    pub repeat_count: u64,
    files: Vec<PathBuf>,
}

impl ActionCtx {
    pub fn new(config: RigConfig, tmpdir: PathBuf) -> Self {
        Self { config, tmpdir, repeat_count: 0, files: Vec::new() }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.config.interval)
    }

    /// Register a file for the rig archive. Files produced outside the
    /// scratch directory are moved into it first.
    pub fn add_archive_file(&mut self, filename: &Path) {
        if filename.starts_with(&self.tmpdir) {
            self.files.push(filename.to_path_buf());
            return;
        }
        let Some(basename) = filename.file_name() else {
            error!("Cannot archive {}: no filename component", filename.display());
            return;
        };
        let dest = self.tmpdir.join(basename);
        match std::fs::rename(filename, &dest) {
            Ok(()) => self.files.push(dest),
            // rename fails across filesystems; fall back to copy + remove
            Err(_) => match std::fs::copy(filename, &dest) {
                Ok(_) => {
                    let _ = std::fs::remove_file(filename);
                    self.files.push(dest);
                }
                Err(err) => {
                    error!(
                        "Unable to move {} to final rig archive: {err}",
                        filename.display()
                    );
                }
            },
        }
    }

    /// Files registered so far, as absolute paths inside the scratch
    /// directory.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Drain the registered files, logging what the action produced.
    pub fn finish_execution(&mut self, action_name: &str) -> Vec<PathBuf> {
        if !self.files.is_empty() {
            let names: Vec<String> = self
                .files
                .iter()
                .filter_map(|f| f.file_name())
                .map(|f| f.to_string_lossy().into_owned())
                .collect();
            info!("Action {action_name} created files {}", names.join(", "));
        }
        std::mem::take(&mut self.files)
    }
}

/// A data collection performed on trigger. Configuration and validation
/// happen in each implementation's `configure` constructor, including the
/// required-binaries check.
#[async_trait]
pub trait Action: Send + std::fmt::Debug {
    /// Registry name, as written in rigfiles.
    fn name(&self) -> &'static str;

    /// Sort key for execution order; lower runs first. The kdump action
    /// is pinned to a very high value and additionally deferred past
    /// archive creation by the rig core.
    fn priority(&self) -> i32 {
        100
    }

    /// Whether `config.repeat` applies to this action.
    fn repeatable(&self) -> bool {
        false
    }

    /// What this action produces, for `describe`/`info`.
    fn produces(&self) -> serde_json::Value;

    /// Hook run before monitors begin. Errors here stop the rig from
    /// starting.
    async fn pre_action(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        let _ = ctx;
        Ok(())
    }

    /// The collection itself.
    async fn trigger(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError>;

    /// Hook run after a successful `trigger`.
    async fn post_action(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        let _ = ctx;
        Ok(())
    }

    /// Release anything the action holds. Runs whether or not `trigger`
    /// succeeded, and again at rig teardown for actions that never
    /// triggered.
    async fn cleanup(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        let _ = ctx;
        Ok(())
    }
}

/// Framework wrapper around an action's `trigger`: handles the configured
/// repetition, the `post_action` hook, and guarantees `cleanup` runs even
/// when a step fails.
pub async fn trigger_action(
    action: &mut dyn Action,
    ctx: &mut ActionCtx,
) -> Result<(), ActionError> {
    ctx.repeat_count = 0;
    let result = run_trigger_steps(action, ctx).await;
    if let Err(err) = action.cleanup(ctx).await {
        warn!("Cleanup for action {} failed: {err}", action.name());
    }
    if let Err(err) = &result {
        error!("Exception triggering action {}: {err}", action.name());
    }
    result
}

async fn run_trigger_steps(
    action: &mut dyn Action,
    ctx: &mut ActionCtx,
) -> Result<(), ActionError> {
    action.trigger(ctx).await?;
    if action.repeatable() && ctx.config.repeat > 0 {
        while ctx.repeat_count < ctx.config.repeat {
            // sleep before the trigger so the first repeat is also delayed
            // from the initial execution
            tokio::time::sleep(Duration::from_secs(ctx.config.repeat_delay)).await;
            ctx.repeat_count += 1;
            info!(
                "Triggering action {} again. Repeat count is now {}. Will repeat {} times total",
                action.name(),
                ctx.repeat_count,
                ctx.config.repeat
            );
            action.trigger(ctx).await?;
        }
    }
    action.post_action(ctx).await
}

/// Resolve a binary against PATH, as the required-binaries check.
pub fn check_binary(binary: &str) -> Result<(), ConfigError> {
    let path = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(binary);
        if is_executable(&candidate) {
            return Ok(());
        }
    }
    Err(ConfigError::MissingBinary(binary.to_string()))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
