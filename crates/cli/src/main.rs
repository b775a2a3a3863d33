// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig` - deploy and manage diagnostic rigs.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rig",
    about = "Monitor a host for a condition and capture diagnostic data when it fires",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a rig from a rigfile
    Deploy {
        /// Path to the rigfile
        rigfile: PathBuf,
        /// Stay attached to the console instead of daemonizing
        #[arg(long)]
        foreground: bool,
    },
    /// List deployed rigs
    List,
    /// Display info about deployed rig(s)
    Info {
        /// Name(s) of the rig(s)
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Manually trigger deployed rig(s)
    Trigger {
        /// Name(s) of the rig(s)
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Terminate rig(s) without triggering actions
    Destroy {
        /// Name(s) of the rig(s)
        #[arg(required = true)]
        names: Vec<String>,
        /// Force-remove the control socket of a dead rig
        #[arg(long)]
        force: bool,
    },
    /// List the monitor types this build supports
    ListMonitors {
        /// Show details for a single monitor
        #[arg(short = 's', long = "show")]
        show: Option<String>,
    },
    /// List the action types this build supports
    ListActions {
        /// Show details for a single action
        #[arg(short = 's', long = "show")]
        show: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Deploy { rigfile, foreground } => commands::deploy::run(&rigfile, foreground),
        Commands::List => block_on(commands::list::run()),
        Commands::Info { names } => block_on(commands::info::run(&names)),
        Commands::Trigger { names } => block_on(commands::trigger::run(&names)),
        Commands::Destroy { names, force } => block_on(commands::destroy::run(&names, force)),
        Commands::ListMonitors { show } => commands::list_types::monitors(show.as_deref()),
        Commands::ListActions { show } => commands::list_types::actions(show.as_deref()),
    };
    std::process::exit(code);
}

/// Run one async command on a fresh runtime. Deploy builds its own
/// runtime after daemonizing, so the runtime cannot live in main.
fn block_on<F: std::future::Future<Output = i32>>(future: F) -> i32 {
    match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime.block_on(future),
        Err(e) => {
            eprintln!("could not start runtime: {e}");
            1
        }
    }
}
