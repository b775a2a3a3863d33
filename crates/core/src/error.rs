// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared across the workspace.
//!
//! Configure-time problems are fatal and stop a rig from starting at all;
//! control-channel problems are reported to the caller of the control
//! operation; subprocess failures are logged and the rig carries on where
//! it can.

use std::path::PathBuf;

use thiserror::Error;

/// A rig refused to start because its configuration is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{option}': {reason}")]
    InvalidOption { option: String, reason: String },

    #[error("unknown monitor '{0}'")]
    UnknownMonitor(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("{kind} '{name}': {source}")]
    BadOptions {
        kind: &'static str,
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("required binary '{0}' not found in PATH")]
    MissingBinary(String),

    #[error("rig must define at least one monitor")]
    NoMonitors,

    #[error("rig must define at least one action")]
    NoActions,

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(option: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidOption { option: option.into(), reason: reason.into() }
    }
}

/// Failures on the control channel, as seen by the CLI side.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("no such rig: {0}")]
    NotFound(String),

    #[error("rig '{name}' is dead. Use --force to fully destroy.")]
    DeadRig { name: String, socket: PathBuf },

    #[error("error communicating with rig {rig}: {message}")]
    Communication { rig: String, message: String },

    #[error("error received from rig {rig}: {message}")]
    Response { rig: String, message: String },
}

/// A subprocess invoked by an action misbehaved.
#[derive(Debug, Error)]
pub enum SubprocessError {
    /// The command ran to completion but exited nonzero. Captured output
    /// rides along so callers can log or degrade without re-running.
    #[error("'{command}' exited {status}: {stderr}")]
    Failed { command: String, status: i32, stdout: String, stderr: String },

    #[error("'{command}' did not finish within {timeout}s")]
    TimedOut { command: String, timeout: u64 },

    #[error("could not run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level failure of a running rig.
#[derive(Debug, Error)]
pub enum RigError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not create control socket: {0}")]
    Socket(std::io::Error),

    #[error("could not create scratch directory {path}: {source}")]
    Tmpdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pre-action '{action}' failed: {message}")]
    PreAction { action: String, message: String },

    #[error("monitor '{monitor}' failed: {message}")]
    Monitor { monitor: String, message: String },

    #[error("could not write archive: {0}")]
    Archive(std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
