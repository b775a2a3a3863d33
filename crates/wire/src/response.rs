// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rig_core::RigStatus;

use super::Command;

/// Response from a rig to the CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    /// Echo of the command this responds to
    pub command: Command,

    pub success: bool,

    /// Command-specific payload; an error string when `success` is false
    pub result: Value,
}

impl Response {
    pub fn ok(command: Command, result: Value) -> Self {
        Self { command, success: true, result }
    }

    pub fn error(command: Command, message: impl Into<String>) -> Self {
        Self { command, success: false, result: Value::String(message.into()) }
    }
}

/// Payload of a successful `describe`/`info` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RigDescription {
    pub name: String,
    pub status: RigStatus,
    /// UTC timestamp the rig started, RFC 3339
    pub start_time: String,
    /// One entry per monitor: `{type, monitoring}`
    pub monitors: Vec<Value>,
    /// One entry per action: `{type, produces}`
    pub actions: Vec<Value>,
    /// The resolved rig-level configuration
    pub configuration: Value,
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
