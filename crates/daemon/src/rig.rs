// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The rig core: lifecycle, trigger race, action pipeline, teardown.
//!
//! One rig is one process. After pre-actions start their background
//! work, the core races every monitor worker, a sentinel polling the
//! manual-trigger flag, the control listener, and the usual termination
//! signals; the first settled outcome decides everything that follows.
//! Teardown is unconditional: whatever the outcome, every worker is
//! stopped, every action's cleanup runs, and the socket and scratch
//! directory are removed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use rig_core::{RigConfig, RigError, RigStatus};
use rig_rigfile::Rigfile;
use rig_wire::RigDescription;

use crate::action::{trigger_action, Action, ActionCtx};
use crate::listener::Listener;
use crate::monitor::{Monitor, MonitorOutcome};
use crate::{archive, env, registry};

/// Filesystem prefixes a rig operates under. Resolved from the
/// environment in production; tests point them at scratch space.
#[derive(Debug, Clone)]
pub struct Paths {
    pub run_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Paths {
    pub fn from_env() -> Self {
        Self {
            run_dir: env::run_dir(),
            tmp_dir: env::tmp_dir(),
            archive_dir: env::archive_dir(),
            log_dir: env::log_dir(),
        }
    }
}

/// First-completed result of the trigger race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceOutcome {
    /// A monitor condition fired (or the manual trigger was raised)
    Triggered { source: String, reason: String },
    /// A monitor decided the rig should stop without running actions
    Cancelled { reason: String },
    /// A destroy request arrived on the control socket, or the process
    /// was told to terminate
    Destroyed,
    /// A monitor worker failed unexpectedly
    Failed { message: String },
}

/// State shared between the rig core and the control listener.
pub struct RigShared {
    pub config: RigConfig,
    pub manual_trigger: AtomicBool,
    pub(crate) status: Mutex<RigStatus>,
    pub(crate) start_time: chrono::DateTime<chrono::Utc>,
    pub(crate) monitors_info: Vec<serde_json::Value>,
    pub(crate) actions_info: Vec<serde_json::Value>,
}

impl RigShared {
    pub fn status(&self) -> RigStatus {
        *self.status.lock()
    }

    /// Advance the one-way status machine; illegal transitions are
    /// ignored so late events cannot drag the rig backwards.
    fn advance(&self, next: RigStatus) {
        let mut status = self.status.lock();
        if status.can_advance_to(next) {
            *status = next;
        }
    }

    pub fn describe(&self) -> RigDescription {
        RigDescription {
            name: self.config.name.clone(),
            status: self.status(),
            start_time: self.start_time.to_rfc3339(),
            monitors: self.monitors_info.clone(),
            actions: self.actions_info.clone(),
            configuration: serde_json::to_value(&self.config)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

pub struct Rig {
    shared: Arc<RigShared>,
    monitors: Vec<Arc<dyn Monitor>>,
    /// Kept sorted ascending by priority from build time
    actions: Vec<Box<dyn Action>>,
    /// Tracks which actions have had `cleanup` run via the trigger
    /// wrapper, so teardown only cleans the rest
    cleaned: Vec<bool>,
    tmpdir: PathBuf,
    paths: Paths,
    kdump_configured: bool,
}

impl Rig {
    /// Validate a loaded rigfile into a ready-to-run rig. Creates the
    /// scratch directory; every monitor and action validates its own
    /// options here, so a bad rigfile never starts background work.
    pub fn build(rigfile: Rigfile, paths: &Paths) -> Result<Rig, RigError> {
        let config = rigfile.config;
        config.validate()?;

        if rigfile.monitors.is_empty() {
            return Err(rig_core::ConfigError::NoMonitors.into());
        }
        if rigfile.actions.is_empty() {
            return Err(rig_core::ConfigError::NoActions.into());
        }

        let mut monitors: Vec<Arc<dyn Monitor>> = Vec::new();
        for (name, options) in &rigfile.monitors {
            let monitor = registry::build_monitor(name, options, &config)?;
            debug!("Monitor {name} configured and validated");
            monitors.push(Arc::from(monitor));
        }

        let mut actions: Vec<Box<dyn Action>> = Vec::new();
        let mut kdump_configured = false;
        for (name, options) in &rigfile.actions {
            let action = registry::build_action(name, options, &config)?;
            debug!("Action {name} configured and validated");
            kdump_configured |= action.name() == "kdump";
            actions.push(action);
        }
        actions.sort_by_key(|a| a.priority());

        let tmp_base = config.tmpdir.clone().unwrap_or_else(|| paths.tmp_dir.clone());
        std::fs::create_dir_all(&tmp_base)
            .map_err(|source| RigError::Tmpdir { path: tmp_base.clone(), source })?;
        let tmpdir = tmp_base.join(format!("rig.{}", config.name));
        std::fs::create_dir(&tmpdir)
            .map_err(|source| RigError::Tmpdir { path: tmpdir.clone(), source })?;

        let shared = Arc::new(RigShared {
            monitors_info: monitors
                .iter()
                .map(|m| serde_json::json!({ "type": m.name(), "monitoring": m.monitoring() }))
                .collect(),
            actions_info: actions
                .iter()
                .map(|a| serde_json::json!({ "type": a.name(), "produces": a.produces() }))
                .collect(),
            config,
            manual_trigger: AtomicBool::new(false),
            status: Mutex::new(RigStatus::Initializing),
            start_time: chrono::Utc::now(),
        });

        let cleaned = vec![false; actions.len()];
        Ok(Rig {
            shared,
            monitors,
            actions,
            cleaned,
            tmpdir,
            paths: paths.clone(),
            kdump_configured,
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &RigConfig {
        &self.shared.config
    }

    pub fn tmpdir(&self) -> &PathBuf {
        &self.tmpdir
    }

    /// Run the rig to completion and return the process exit code.
    pub async fn run(mut self) -> Result<i32, RigError> {
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<RaceOutcome>(16);
        let cancel = CancellationToken::new();

        let listener = Listener::bind(&self.paths.run_dir, Arc::clone(&self.shared), outcome_tx.clone())?;
        let socket_path = listener.socket_path().to_path_buf();

        let mut ctx = ActionCtx::new(self.shared.config.clone(), self.tmpdir.clone());

        // pre-actions run before any monitoring begins; a failure here is
        // fatal and nothing is collected
        for action in self.actions.iter_mut() {
            if let Err(err) = action.pre_action(&mut ctx).await {
                error!("Error during {} pre-action: {err}", action.name());
                info!("Rig terminating due to previous error");
                self.teardown(&mut ctx, &socket_path).await;
                return Ok(1);
            }
        }

        tokio::spawn(listener.run(cancel.child_token()));
        self.spawn_monitor_workers(&outcome_tx, &cancel);
        spawn_signal_workers(&outcome_tx);

        self.shared.advance(RigStatus::Running);
        info!("Rig {} running", self.name());

        let outcome = outcome_rx
            .recv()
            .await
            .unwrap_or(RaceOutcome::Failed { message: "trigger race collapsed".to_string() });
        cancel.cancel();

        let exit_code = match outcome {
            RaceOutcome::Triggered { source, reason } => {
                info!("Monitor {source} completed. Triggering rig: {reason}");
                self.shared.advance(RigStatus::Triggered);
                self.handle_trigger(&mut ctx).await;
                0
            }
            RaceOutcome::Cancelled { reason } => {
                info!("Destroying rig without triggering actions due to: {reason}");
                0
            }
            RaceOutcome::Destroyed => {
                self.shared.advance(RigStatus::Destroying);
                0
            }
            RaceOutcome::Failed { message } => {
                error!("Exception caught for rig {}: {message}", self.name());
                error!("Terminating without triggering due to previous error");
                1
            }
        };

        self.teardown(&mut ctx, &socket_path).await;
        info!("Rig {} terminating", self.name());
        Ok(exit_code)
    }

    fn spawn_monitor_workers(
        &self,
        outcomes: &mpsc::Sender<RaceOutcome>,
        cancel: &CancellationToken,
    ) {
        let interval = Duration::from_secs(self.shared.config.interval);

        for monitor in &self.monitors {
            let monitor = Arc::clone(monitor);
            let outcomes = outcomes.clone();
            let cancel = cancel.child_token();
            tokio::spawn(async move {
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => return,
                    result = monitor.start(interval) => match result {
                        Ok(MonitorOutcome::Triggered(reason)) => RaceOutcome::Triggered {
                            source: monitor.name().to_string(),
                            reason,
                        },
                        Ok(MonitorOutcome::Cancelled(reason)) => {
                            RaceOutcome::Cancelled { reason }
                        }
                        Err(err) => RaceOutcome::Failed {
                            message: format!("monitor {}: {err}", monitor.name()),
                        },
                    },
                };
                let _ = outcomes.send(outcome).await;
            });
        }

        // sentinel worker: polls the flag the control listener raises on
        // a manual trigger request
        let shared = Arc::clone(&self.shared);
        let outcomes = outcomes.clone();
        let cancel = cancel.child_token();
        tokio::spawn(async move {
            loop {
                if shared.manual_trigger.load(Ordering::SeqCst) {
                    debug!("Trigger from cmdline received. Triggering monitor");
                    let _ = outcomes
                        .send(RaceOutcome::Triggered {
                            source: "manual".to_string(),
                            reason: "manual trigger requested over control socket".to_string(),
                        })
                        .await;
                    return;
                }
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
        });
    }

    /// The serial action pipeline. kdump-class actions are deferred past
    /// archive creation since their side effect may crash the host.
    async fn handle_trigger(&mut self, ctx: &mut ActionCtx) {
        let delay = self.shared.config.delay;
        if delay > 0 {
            debug!("Delaying trigger for {delay} seconds");
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }

        info!("Beginning triggering of actions");
        let mut files = Vec::new();
        for (idx, action) in self.actions.iter_mut().enumerate() {
            if action.name() == "kdump" {
                info!(
                    "Skipping action kdump until rig has otherwise completed all actions and \
                     generated its archive"
                );
                continue;
            }
            debug!("Triggering action {}", action.name());
            if let Err(err) = trigger_action(action.as_mut(), ctx).await {
                error!("Error executing action {}: {err}", action.name());
            }
            self.cleaned[idx] = true;
            files.extend(ctx.finish_execution(action.name()));
        }
        debug!("Actions contributed {} file(s) to the archive", files.len());

        if self.shared.config.no_archive {
            info!("Skipping archive creation as configured");
        } else {
            match archive::create(&self.tmpdir, self.name(), &self.paths.archive_dir) {
                Ok(Some(path)) => info!(
                    "An archive containing this rig's data is available at {}",
                    path.display()
                ),
                Ok(None) => {}
                Err(err) => error!("Could not write archive: {err}"),
            }
        }

        if self.kdump_configured {
            info!(
                "Kdump action has been configured, please note that rig archive will not \
                 contain generated vmcore"
            );
            for (idx, action) in self.actions.iter_mut().enumerate() {
                if action.name() == "kdump" {
                    if let Err(err) = trigger_action(action.as_mut(), ctx).await {
                        error!("Error executing action kdump: {err}");
                    }
                    self.cleaned[idx] = true;
                }
            }
        }
    }

    /// Unconditional teardown: cleanup every action the trigger wrapper
    /// did not already clean, remove the control socket, and remove the
    /// scratch directory. Runs after the archive writer has finished.
    /// Errors are logged and swallowed so teardown always completes.
    async fn teardown(&mut self, ctx: &mut ActionCtx, socket_path: &PathBuf) {
        for (idx, action) in self.actions.iter_mut().enumerate() {
            if self.cleaned[idx] {
                continue;
            }
            if let Err(err) = action.cleanup(ctx).await {
                warn!("Cleanup for action {} failed: {err}", action.name());
            }
            self.cleaned[idx] = true;
        }

        if let Err(err) = std::fs::remove_file(socket_path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                error!("Failed to remove socket {}: {err}", socket_path.display());
            }
        }

        if let Err(err) = std::fs::remove_dir_all(&self.tmpdir) {
            if err.kind() != std::io::ErrorKind::NotFound {
                error!("Could not remove temp directory: {err}");
            }
        }

        self.shared.advance(RigStatus::Exiting);
    }
}

/// SIGTERM and SIGINT end the rig exactly like a destroy request.
fn spawn_signal_workers(outcomes: &mpsc::Sender<RaceOutcome>) {
    use tokio::signal::unix::{signal, SignalKind};
    let outcomes = outcomes.clone();
    tokio::spawn(async move {
        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut int = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(_) => return,
        };
        tokio::select! {
            _ = term.recv() => {}
            _ = int.recv() => {}
        }
        debug!("Received termination signal, destroying rig.");
        let _ = outcomes.send(RaceOutcome::Destroyed).await;
    });
}

#[cfg(test)]
#[path = "rig_tests.rs"]
mod tests;
