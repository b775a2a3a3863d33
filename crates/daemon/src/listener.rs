// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-rig control socket.
//!
//! Each rig listens on `<run-dir>/<name>` for the lifetime of its
//! process. Connections are short-lived: one request, one response. The
//! `destroy` handler writes and flushes its acknowledgement before
//! reporting the outcome to the rig core, because winning the race ends
//! this listener.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use rig_core::RigError;
use rig_wire::{read_request, write_response, Command, Request, Response};

use crate::env::ipc_timeout;
use crate::rig::{RaceOutcome, RigShared};

pub struct Listener {
    listener: UnixListener,
    socket_path: PathBuf,
    shared: Arc<RigShared>,
    outcomes: mpsc::Sender<RaceOutcome>,
}

impl Listener {
    /// Bind the rig's control socket, refusing to displace a live rig
    /// with the same name. A leftover socket nobody answers on is
    /// removed as stale.
    pub fn bind(
        run_dir: &Path,
        shared: Arc<RigShared>,
        outcomes: mpsc::Sender<RaceOutcome>,
    ) -> Result<Self, RigError> {
        std::fs::create_dir_all(run_dir).map_err(RigError::Socket)?;
        let socket_path = run_dir.join(&shared.config.name);

        if socket_path.exists() {
            if std::os::unix::net::UnixStream::connect(&socket_path).is_ok() {
                return Err(RigError::Socket(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    format!("a rig named '{}' is already running", shared.config.name),
                )));
            }
            debug!("Removing stale socket {}", socket_path.display());
            std::fs::remove_file(&socket_path).map_err(RigError::Socket)?;
        }

        let listener = UnixListener::bind(&socket_path).map_err(RigError::Socket)?;
        debug!("Socket created at {}", socket_path.display());
        Ok(Self { listener, socket_path, shared, outcomes })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept and serve connections until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        debug!("Listening on {}", self.socket_path.display());
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let shared = Arc::clone(&self.shared);
                            let outcomes = self.outcomes.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, shared, outcomes).await {
                                    debug!("Control connection error: {e}");
                                }
                            });
                        }
                        Err(e) => error!("Control socket accept error: {e}"),
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    shared: Arc<RigShared>,
    outcomes: mpsc::Sender<RaceOutcome>,
) -> Result<(), rig_wire::ProtocolError> {
    let request = read_request(&mut stream, ipc_timeout()).await?;
    debug!("Received request '{}' from socket", request.command.as_str());

    let response = handle_request(&request, &shared);
    write_response(&mut stream, &response).await?;

    // the destroy acknowledgement must reach the client before the rig
    // starts tearing this listener down
    if request.command == Command::Destroy && response.success {
        info!("Destroying rig");
        let _ = outcomes.send(RaceOutcome::Destroyed).await;
    }
    Ok(())
}

fn handle_request(request: &Request, shared: &RigShared) -> Response {
    if request.rig_name != shared.config.name {
        return Response::error(
            request.command,
            format!(
                "request for rig '{}' reached rig '{}'",
                request.rig_name, shared.config.name
            ),
        );
    }
    match request.command {
        Command::Status => Response::ok(
            request.command,
            serde_json::json!(shared.status().to_string()),
        ),
        Command::Describe | Command::Info => match serde_json::to_value(shared.describe()) {
            Ok(description) => Response::ok(request.command, description),
            Err(e) => Response::error(request.command, e.to_string()),
        },
        Command::Trigger => {
            debug!("Trigger from cmdline received");
            shared.manual_trigger.store(true, Ordering::SeqCst);
            Response::ok(request.command, serde_json::json!("triggered"))
        }
        Command::Destroy => Response::ok(request.command, serde_json::json!("destroyed")),
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
