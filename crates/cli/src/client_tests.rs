// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn missing_socket_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let client = RigClient::new(dir.path(), "ghost");
    let err = client.status().await.unwrap_err();
    assert!(matches!(err, ControlError::NotFound(_)));
}

#[tokio::test]
async fn unanswered_socket_is_a_dead_rig() {
    let dir = tempfile::tempdir().unwrap();
    // an entry nobody listens on: the rig died without cleaning up
    drop(std::os::unix::net::UnixListener::bind(dir.path().join("corpse")).unwrap());

    let client = RigClient::new(dir.path(), "corpse");
    let err = client.destroy().await.unwrap_err();
    assert!(matches!(err, ControlError::DeadRig { .. }));

    client.force_remove().unwrap();
    assert!(!client.socket_path().exists());
}

#[test]
fn list_rig_names_sorted() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("zeta"), "").unwrap();
    std::fs::write(dir.path().join("alpha"), "").unwrap();
    assert_eq!(list_rig_names(dir.path()), vec!["alpha", "zeta"]);
}

#[test]
fn empty_run_dir_lists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    assert!(list_rig_names(dir.path()).is_empty());
    assert!(list_rig_names(&dir.path().join("missing")).is_empty());
}
