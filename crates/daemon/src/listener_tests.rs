// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicBool, Ordering};

use super::*;
use parking_lot::Mutex;
use rig_core::{RigConfig, RigStatus};
use rig_wire::{decode, encode, read_message, write_message};

fn shared(name: &str) -> Arc<RigShared> {
    let config: RigConfig =
        serde_json::from_value(serde_json::json!({ "name": name })).unwrap();
    Arc::new(RigShared {
        config,
        manual_trigger: AtomicBool::new(false),
        status: Mutex::new(RigStatus::Running),
        start_time: chrono::Utc::now(),
        monitors_info: vec![serde_json::json!({"type": "timer"})],
        actions_info: vec![serde_json::json!({"type": "noop"})],
    })
}

struct Fixture {
    _dir: tempfile::TempDir,
    socket_path: PathBuf,
    outcomes: mpsc::Receiver<RaceOutcome>,
    cancel: CancellationToken,
}

fn start(name: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = mpsc::channel(4);
    let listener = Listener::bind(dir.path(), shared(name), tx).unwrap();
    let socket_path = listener.socket_path().to_path_buf();
    let cancel = CancellationToken::new();
    tokio::spawn(listener.run(cancel.child_token()));
    Fixture { _dir: dir, socket_path, outcomes: rx, cancel }
}

async fn roundtrip(socket_path: &PathBuf, request: &Request) -> Response {
    let mut stream = UnixStream::connect(socket_path).await.unwrap();
    let bytes = encode(request).unwrap();
    write_message(&mut stream, &bytes).await.unwrap();
    let raw = read_message(&mut stream).await.unwrap();
    decode(&raw).unwrap()
}

#[tokio::test]
async fn status_request_reports_current_state() {
    let fixture = start("demo");
    let response =
        roundtrip(&fixture.socket_path, &Request::new(Command::Status, "demo")).await;
    assert!(response.success);
    assert_eq!(response.result, serde_json::json!("Running"));
    fixture.cancel.cancel();
}

#[tokio::test]
async fn describe_returns_snapshot() {
    let fixture = start("demo");
    let response =
        roundtrip(&fixture.socket_path, &Request::new(Command::Describe, "demo")).await;
    assert!(response.success);
    let desc: rig_wire::RigDescription = serde_json::from_value(response.result).unwrap();
    assert_eq!(desc.name, "demo");
    assert_eq!(desc.status, RigStatus::Running);
    assert_eq!(desc.monitors.len(), 1);
    assert_eq!(desc.actions.len(), 1);
    fixture.cancel.cancel();
}

#[tokio::test]
async fn info_is_an_alias_for_describe() {
    let fixture = start("demo");
    let response = roundtrip(&fixture.socket_path, &Request::new(Command::Info, "demo")).await;
    assert!(response.success);
    assert_eq!(response.command, Command::Info);
    fixture.cancel.cancel();
}

#[tokio::test]
async fn trigger_raises_the_manual_flag() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, _rx) = mpsc::channel(4);
    let shared = shared("demo");
    let listener = Listener::bind(dir.path(), Arc::clone(&shared), tx).unwrap();
    let socket_path = listener.socket_path().to_path_buf();
    let cancel = CancellationToken::new();
    tokio::spawn(listener.run(cancel.child_token()));

    let response = roundtrip(&socket_path, &Request::new(Command::Trigger, "demo")).await;
    assert!(response.success);
    assert!(shared.manual_trigger.load(Ordering::SeqCst));
    cancel.cancel();
}

#[tokio::test]
async fn destroy_acknowledges_before_reporting_outcome() {
    let mut fixture = start("demo");
    let response =
        roundtrip(&fixture.socket_path, &Request::new(Command::Destroy, "demo")).await;
    // the ack arrived; only then may the outcome surface
    assert!(response.success);
    assert_eq!(response.result, serde_json::json!("destroyed"));
    let outcome = fixture.outcomes.recv().await.unwrap();
    assert_eq!(outcome, RaceOutcome::Destroyed);
    fixture.cancel.cancel();
}

#[tokio::test]
async fn mismatched_rig_name_is_refused() {
    let mut fixture = start("demo");
    let response =
        roundtrip(&fixture.socket_path, &Request::new(Command::Destroy, "other")).await;
    assert!(!response.success);
    // a refused destroy must not settle the race
    assert!(fixture.outcomes.try_recv().is_err());
    fixture.cancel.cancel();
}

#[tokio::test]
async fn stale_socket_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    // a socket file nobody listens on
    drop(std::os::unix::net::UnixListener::bind(dir.path().join("demo")).unwrap());

    let (tx, _rx) = mpsc::channel(4);
    let listener = Listener::bind(dir.path(), shared("demo"), tx).unwrap();
    let cancel = CancellationToken::new();
    let socket_path = listener.socket_path().to_path_buf();
    tokio::spawn(listener.run(cancel.child_token()));
    let response = roundtrip(&socket_path, &Request::new(Command::Status, "demo")).await;
    assert!(response.success);
    cancel.cancel();
}

#[tokio::test]
async fn live_rig_with_same_name_blocks_bind() {
    let fixture = start("demo");
    let (tx, _rx) = mpsc::channel(4);
    let err = Listener::bind(fixture._dir.path(), shared("demo"), tx).unwrap_err();
    assert!(err.to_string().contains("already running"));
    fixture.cancel.cancel();
}
