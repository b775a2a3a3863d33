// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig list-monitors` / `rig list-actions` - enumerate the monitor and
//! action types compiled into this build.

use rig_daemon::registry::{ACTIONS, MONITORS};

pub fn monitors(show: Option<&str>) -> i32 {
    match show {
        None => {
            for kind in MONITORS {
                println!("{:<12} {}", kind.name, kind.description);
            }
            0
        }
        Some(name) => match rig_daemon::registry::find_monitor(name) {
            Some(kind) => {
                println!("{}\n\n{}", kind.name, kind.description);
                0
            }
            None => {
                eprintln!("No such monitor: {name}");
                1
            }
        },
    }
}

pub fn actions(show: Option<&str>) -> i32 {
    match show {
        None => {
            for kind in ACTIONS {
                println!("{:<12} {}", kind.name, kind.description);
            }
            0
        }
        Some(name) => match rig_daemon::registry::find_action(name) {
            Some(kind) => {
                println!("{}\n\n{}", kind.name, kind.description);
                0
            }
            None => {
                eprintln!("No such action: {name}");
                1
            }
        },
    }
}
