// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig info` - display a rig's describe snapshot.

use rig_daemon::env::run_dir;

use crate::client::RigClient;

pub async fn run(names: &[String]) -> i32 {
    let run_dir = run_dir();
    let mut failures = 0;
    for name in names {
        let client = RigClient::new(&run_dir, name);
        match client.describe().await {
            Ok(description) => {
                let rendered = serde_json::to_string_pretty(&description)
                    .unwrap_or_else(|_| description.to_string());
                println!("{rendered}");
            }
            Err(e) => {
                eprintln!("{e}");
                failures += 1;
            }
        }
    }
    i32::from(failures > 0)
}
