// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-way rig lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a running rig, reported over the control socket.
///
/// Transitions only ever move forward: `Initializing → Running`, then one
/// of `Triggered`, `Destroying`, or straight to `Exiting` on cancellation.
/// No state is re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RigStatus {
    Initializing,
    Running,
    Triggered,
    Destroying,
    Exiting,
}

impl RigStatus {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: RigStatus) -> bool {
        use RigStatus::*;
        matches!(
            (self, next),
            (Initializing, Running)
                | (Running, Triggered)
                | (Running, Destroying)
                | (Running, Exiting)
                | (Triggered, Exiting)
                | (Destroying, Exiting)
        )
    }
}

impl fmt::Display for RigStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RigStatus::Initializing => "Initializing",
            RigStatus::Running => "Running",
            RigStatus::Triggered => "Triggered",
            RigStatus::Destroying => "Destroying",
            RigStatus::Exiting => "Exiting",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
