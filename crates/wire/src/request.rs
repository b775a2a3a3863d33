// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Operations a rig understands on its control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Terminate the rig without running actions or producing an archive
    Destroy,
    /// Raise the manual-trigger flag, as if a monitor had fired
    Trigger,
    /// Return a snapshot of the rig's configuration and state
    Describe,
    /// Alias of `describe` kept for rigfile-era compatibility
    Info,
    /// Return just the rig's lifecycle status
    Status,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Destroy => "destroy",
            Command::Trigger => "trigger",
            Command::Describe => "describe",
            Command::Info => "info",
            Command::Status => "status",
        }
    }
}

/// Request from the CLI to a rig
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub command: Command,

    /// Name of the rig the caller believes it is talking to
    pub rig_name: String,

    /// Free-form argument for commands that take one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl Request {
    pub fn new(command: Command, rig_name: impl Into<String>) -> Self {
        Self { command, rig_name: rig_name.into(), extra: None }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
