// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig list` - show every rig with a control socket entry.

use rig_core::ControlError;
use rig_daemon::env::run_dir;

use crate::client::{list_rig_names, RigClient};

pub async fn run() -> i32 {
    let run_dir = run_dir();
    let names = list_rig_names(&run_dir);
    if names.is_empty() {
        println!("No rigs deployed");
        return 0;
    }

    println!("{:<24} {:<12}", "NAME", "STATUS");
    for name in names {
        let client = RigClient::new(&run_dir, &name);
        let status = match client.status().await {
            Ok(status) => status,
            Err(ControlError::DeadRig { .. }) => {
                "Dead (destroy with --force to remove)".to_string()
            }
            Err(e) => format!("Unknown ({e})"),
        };
        println!("{name:<24} {status:<12}");
    }
    0
}
