// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the per-rig control socket.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::UnixStream;

use rig_core::ControlError;
use rig_wire::{decode, encode, read_message, write_message, Command, Request, Response};

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RigClient {
    name: String,
    socket: PathBuf,
}

impl RigClient {
    pub fn new(run_dir: &Path, name: &str) -> Self {
        Self { name: name.to_string(), socket: run_dir.join(name) }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket
    }

    /// Remove a dead rig's socket entry. Only meaningful with `--force`
    /// after a connection attempt reported the rig dead.
    pub fn force_remove(&self) -> std::io::Result<()> {
        std::fs::remove_file(&self.socket)
    }

    async fn connect(&self) -> Result<UnixStream, ControlError> {
        if !self.socket.exists() {
            return Err(ControlError::NotFound(self.name.clone()));
        }
        match UnixStream::connect(&self.socket).await {
            Ok(stream) => Ok(stream),
            // entry exists but nobody is listening: the rig died without
            // cleaning up
            Err(_) => Err(ControlError::DeadRig {
                name: self.name.clone(),
                socket: self.socket.clone(),
            }),
        }
    }

    /// One request/response exchange. A response with `success: false`
    /// surfaces as a `Response` error carrying the rig's message.
    pub async fn request(&self, command: Command) -> Result<Response, ControlError> {
        let mut stream = self.connect().await?;
        let request = Request::new(command, &self.name);
        let communication = |e: String| ControlError::Communication {
            rig: self.name.clone(),
            message: e,
        };

        let bytes = encode(&request).map_err(|e| communication(e.to_string()))?;
        write_message(&mut stream, &bytes)
            .await
            .map_err(|e| communication(e.to_string()))?;

        let raw = tokio::time::timeout(CLIENT_TIMEOUT, read_message(&mut stream))
            .await
            .map_err(|_| communication("timed out waiting for response".to_string()))?
            .map_err(|e| communication(e.to_string()))?;
        let response: Response = decode(&raw).map_err(|e| communication(e.to_string()))?;

        if !response.success {
            return Err(ControlError::Response {
                rig: self.name.clone(),
                message: response
                    .result
                    .as_str()
                    .unwrap_or("unspecified error")
                    .to_string(),
            });
        }
        Ok(response)
    }

    pub async fn destroy(&self) -> Result<(), ControlError> {
        self.request(Command::Destroy).await.map(|_| ())
    }

    pub async fn trigger(&self) -> Result<(), ControlError> {
        self.request(Command::Trigger).await.map(|_| ())
    }

    pub async fn describe(&self) -> Result<serde_json::Value, ControlError> {
        self.request(Command::Describe).await.map(|r| r.result)
    }

    pub async fn status(&self) -> Result<String, ControlError> {
        let response = self.request(Command::Status).await?;
        Ok(response.result.as_str().unwrap_or("unknown").to_string())
    }
}

/// Names of every rig with a control socket entry, dead or alive.
pub fn list_rig_names(run_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(run_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
