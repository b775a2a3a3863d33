// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detach from the console with the standard double-fork sequence.
//!
//! Must run before the tokio runtime is built: forking a process that
//! already has runtime threads is unsound. The caller prints the rig
//! name first, since both intermediate parents exit immediately and the
//! grandchild owns no terminal.

use std::os::fd::AsRawFd;

use nix::sys::stat::{umask, Mode};
use nix::unistd::{chdir, dup2, fork, setsid, ForkResult};

/// Fork into the background. Returns only in the fully detached
/// grandchild; both parents exit 0.
pub fn daemonize() -> std::io::Result<()> {
    fork_and_exit_parent()?;
    setsid().map_err(std::io::Error::from)?;
    umask(Mode::empty());
    fork_and_exit_parent()?;

    chdir("/").map_err(std::io::Error::from)?;
    redirect_stdio()?;
    Ok(())
}

fn fork_and_exit_parent() -> std::io::Result<()> {
    // SAFETY: called before any threads are spawned; the child only
    // continues the single-threaded startup path
    match unsafe { fork() }.map_err(std::io::Error::from)? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => Ok(()),
    }
}

fn redirect_stdio() -> std::io::Result<()> {
    let devnull = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")?;
    let fd = devnull.as_raw_fd();
    for std_fd in 0..3 {
        dup2(fd, std_fd).map_err(std::io::Error::from)?;
    }
    Ok(())
}
