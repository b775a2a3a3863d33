// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig trigger` - manually trigger deployed rigs.
//!
//! Each named rig is triggered in turn; the command does not wait for
//! any rig to finish running its actions.

use rig_daemon::env::run_dir;

use crate::client::RigClient;

pub async fn run(names: &[String]) -> i32 {
    let run_dir = run_dir();
    let mut failures = 0;
    for name in names {
        let client = RigClient::new(&run_dir, name);
        match client.trigger().await {
            Ok(()) => println!("Rig '{name}' triggered"),
            Err(e) => {
                eprintln!("Failed triggering '{name}': {e}");
                failures += 1;
            }
        }
    }
    i32::from(failures > 0)
}
