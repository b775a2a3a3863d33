// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for subprocesses spawned by actions.
pub const SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(180);

/// Directory holding one control socket per live rig:
/// `RIG_RUN_DIR` > `/run/rig`
pub fn run_dir() -> PathBuf {
    match std::env::var("RIG_RUN_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("/run/rig"),
    }
}

/// Prefix under which per-rig scratch directories are created:
/// `RIG_TMP_DIR` > `/var/tmp`
pub fn tmp_dir() -> PathBuf {
    match std::env::var("RIG_TMP_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("/var/tmp"),
    }
}

/// Where finished archives are written:
/// `RIG_ARCHIVE_DIR` > `/var/tmp`
pub fn archive_dir() -> PathBuf {
    match std::env::var("RIG_ARCHIVE_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("/var/tmp"),
    }
}

/// Parent of the shared daemon log directory:
/// `RIG_LOG_DIR` > `/var/log`
pub fn log_dir() -> PathBuf {
    match std::env::var("RIG_LOG_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("/var/log"),
    }
}

/// Bounded wait for a single control-channel read.
pub fn ipc_timeout() -> Duration {
    std::env::var("RIG_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
