// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging for a rig process.
//!
//! Every rig writes to the shared daemon log `<log-dir>/rig/rig.log`
//! (size-bounded, five rotations of ~1 MiB) and to a per-rig log inside
//! its scratch directory, so the log rides along in the final archive.
//! Console output is added only in foreground mode.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rig_core::RigConfig;

const MAX_LOG_BYTES: u64 = 1024 * 1024;
const BACKUP_COUNT: u32 = 5;

/// Handles that must stay alive for the non-blocking writers to flush.
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// A `Write` implementation with size-bounded rotation: when the file
/// passes `max_bytes` it is renamed to `.1`, shifting older backups up
/// to `.{backups}` which falls off.
#[derive(Clone)]
pub struct RotatingWriter {
    inner: Arc<Mutex<RotatingInner>>,
}

struct RotatingInner {
    path: PathBuf,
    file: File,
    max_bytes: u64,
    backups: u32,
}

impl RotatingWriter {
    pub fn open(path: &Path, max_bytes: u64, backups: u32) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(RotatingInner {
                path: path.to_path_buf(),
                file,
                max_bytes,
                backups,
            })),
        })
    }
}

impl RotatingInner {
    fn rotate(&mut self) -> std::io::Result<()> {
        for n in (1..self.backups).rev() {
            let from = self.path.with_extension(format!("log.{n}"));
            if from.exists() {
                std::fs::rename(&from, self.path.with_extension(format!("log.{}", n + 1)))?;
            }
        }
        std::fs::rename(&self.path, self.path.with_extension("log.1"))?;
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(())
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self.inner.lock();
        if inner.file.metadata()?.len() + buf.len() as u64 > inner.max_bytes {
            inner.rotate()?;
        }
        inner.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.lock().file.flush()
    }
}

/// Install the subscriber for this rig process. Returns guards that must
/// live until exit.
pub fn init(config: &RigConfig, tmpdir: &Path, log_dir: &Path) -> std::io::Result<LogGuards> {
    let filter = EnvFilter::try_from_env("RIG_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let daemon_log = log_dir.join("rig").join("rig.log");
    let daemon_writer = RotatingWriter::open(&daemon_log, MAX_LOG_BYTES, BACKUP_COUNT)?;
    let (daemon_nb, daemon_guard) = tracing_appender::non_blocking(daemon_writer);

    let rig_log = tmpdir.join(format!("rig_{}.log", config.name));
    let rig_writer = RotatingWriter::open(&rig_log, MAX_LOG_BYTES, BACKUP_COUNT)?;
    let (rig_nb, rig_guard) = tracing_appender::non_blocking(rig_writer);

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(daemon_nb),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(rig_nb),
        );

    let result = if config.foreground {
        registry.with(tracing_subscriber::fmt::layer().with_target(false)).try_init()
    } else {
        registry.try_init()
    };
    // a second init in the same process (tests) is not an error worth
    // failing the rig over
    let _ = result;

    Ok(LogGuards { _guards: vec![daemon_guard, rig_guard] })
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
