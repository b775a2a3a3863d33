// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor framework.
//!
//! A monitor watches the host for one condition and blocks until it is
//! met. Monitors that watch several resources at once (multiple files,
//! multiple PIDs) register one worker per resource; the framework races
//! the workers with first-completed semantics, so the first worker to
//! return settles the whole monitor.

pub mod cpu;
pub mod filesystem;
pub mod log;
pub mod memory;
pub mod packet;
pub mod process;
pub mod system;
pub mod timer;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;

/// How a monitor resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The condition was met; the rig should run its actions.
    /// Carries a human-readable account of what matched.
    Triggered(String),

    /// The monitor decided the rig should stop without running actions
    /// (timer with `trigger_on_expiry: false`, process watch with every
    /// watched PID gone).
    Cancelled(String),
}

/// An unexpected failure inside a monitor worker. The rig exits nonzero
/// without triggering.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Worker(String),
}

pub type MonitorResult = Result<MonitorOutcome, MonitorError>;

/// A condition watcher. Configuration and validation happen in each
/// implementation's `configure` constructor (dispatched by the registry);
/// by the time a value of this trait exists, its options are known good.
#[async_trait]
pub trait Monitor: Send + Sync + std::fmt::Debug {
    /// Registry name, as written in rigfiles.
    fn name(&self) -> &'static str;

    /// What this monitor is watching, for `describe`/`info`.
    fn monitoring(&self) -> serde_json::Value;

    /// Block until the condition fires or the monitor cancels the rig.
    async fn start(&self, interval: Duration) -> MonitorResult;
}

/// Race a set of spawned workers, returning the first settled result and
/// aborting the rest. The rig process does not outlive its workers by
/// more than its own teardown, so aborted workers never leak past exit.
pub(crate) async fn first_completed(mut workers: JoinSet<MonitorResult>) -> MonitorResult {
    let result = match workers.join_next().await {
        Some(Ok(result)) => result,
        Some(Err(e)) => Err(MonitorError::Worker(format!("worker panicked: {e}"))),
        None => Err(MonitorError::Worker("monitor registered no workers".to_string())),
    };
    workers.abort_all();
    result
}
