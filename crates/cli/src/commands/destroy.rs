// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig destroy` - terminate rigs without triggering their actions.
//!
//! One bad target does not stop iteration; every named rig is attempted
//! and the exit code reflects whether any failed.

use rig_core::ControlError;
use rig_daemon::env::run_dir;

use crate::client::RigClient;

pub async fn run(names: &[String], force: bool) -> i32 {
    let run_dir = run_dir();
    let mut failures = 0;
    for name in names {
        let client = RigClient::new(&run_dir, name);
        match client.destroy().await {
            Ok(()) => println!("Rig '{name}' destroyed"),
            Err(ControlError::DeadRig { .. }) if force => match client.force_remove() {
                Ok(()) => println!("Removed dead rig '{name}'"),
                Err(e) => {
                    eprintln!("Could not remove dead rig '{name}': {e}");
                    failures += 1;
                }
            },
            Err(ControlError::NotFound(_)) => {
                eprintln!("No such rig: {name}");
                failures += 1;
            }
            Err(e) => {
                eprintln!("{e}");
                failures += 1;
            }
        }
    }
    i32::from(failures > 0)
}
