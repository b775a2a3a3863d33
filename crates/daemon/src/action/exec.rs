// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded subprocess execution for actions.

use std::process::Stdio;
use std::time::Duration;

use tracing::debug;

use rig_core::SubprocessError;

pub use crate::env::SUBPROCESS_TIMEOUT;

/// Captured output of a subprocess that exited zero. Nonzero exits
/// surface as [`SubprocessError::Failed`] instead.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Split a command line into argv, honoring single and double quotes.
/// Rig commands come from rigfiles, not interactive shells, so globbing,
/// variable expansion, and the rest of shell semantics stay out of scope.
pub fn split_command(cmd: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut has_token = false;

    for c in cmd.chars() {
        match (c, quote) {
            ('\'' | '"', None) => {
                quote = Some(c);
                has_token = true;
            }
            (c, Some(q)) if c == q => quote = None,
            (c, None) if c.is_whitespace() => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            (c, _) => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

/// Run a command without a TTY, capturing stdout and stderr, enforcing a
/// timeout. A command still running at the deadline is killed; a nonzero
/// exit is a [`SubprocessError::Failed`] carrying the captured output.
pub async fn run_command(cmd: &str, timeout: Duration) -> Result<CmdOutput, SubprocessError> {
    debug!("Running command {cmd}");
    let argv = split_command(cmd);
    let Some((program, args)) = argv.split_first() else {
        return Err(SubprocessError::Spawn {
            command: cmd.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        });
    };

    let child = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SubprocessError::Spawn { command: cmd.to_string(), source })?;

    // kill_on_drop reaps the child if the timeout wins the race
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| SubprocessError::TimedOut {
            command: cmd.to_string(),
            timeout: timeout.as_secs(),
        })?
        .map_err(|source| SubprocessError::Spawn { command: cmd.to_string(), source })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(SubprocessError::Failed {
            command: cmd.to_string(),
            status: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        });
    }
    Ok(CmdOutput { stdout, stderr })
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
