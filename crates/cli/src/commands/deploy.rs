// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig deploy` - validate a rigfile and start its rig process.
//!
//! Everything that can fail validation does so before the fork, so
//! configuration errors always reach the invoking console. The parent
//! prints the rig name and exits; the detached grandchild builds the
//! runtime and runs the rig to completion.

use std::path::Path;

use rig_daemon::{daemonize, logging, Paths, Rig};

pub fn run(rigfile_path: &Path, foreground: bool) -> i32 {
    let mut rigfile = match rig_rigfile::load(rigfile_path) {
        Ok(rigfile) => rigfile,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };
    rigfile.config.foreground |= foreground;

    let paths = Paths::from_env();
    let rig = match Rig::build(rigfile, &paths) {
        Ok(rig) => rig,
        Err(e) => {
            eprintln!("Could not create rig: {e}");
            return 1;
        }
    };

    let config = rig.config().clone();
    let tmpdir = rig.tmpdir().clone();

    // the name is the operator's handle for every later command
    println!("{}", rig.name());

    if !config.foreground {
        if let Err(e) = daemonize::daemonize() {
            eprintln!("Could not detach from console: {e}");
            return 1;
        }
    }

    let _log_guards = match logging::init(&config, &tmpdir, &paths.log_dir) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("Could not set up logging: {e}");
            return 1;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Could not start runtime: {e}");
            return 1;
        }
    };
    match runtime.block_on(rig.run()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Rig failed: {e}");
            1
        }
    }
}
