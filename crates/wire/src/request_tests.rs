// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    destroy = { Command::Destroy, "destroy" },
    trigger = { Command::Trigger, "trigger" },
    describe = { Command::Describe, "describe" },
    info = { Command::Info, "info" },
    status = { Command::Status, "status" },
)]
fn command_spelling(cmd: Command, expected: &str) {
    assert_eq!(cmd.as_str(), expected);
    let json = serde_json::to_string(&cmd).unwrap();
    assert_eq!(json, format!("\"{expected}\""));
}

#[test]
fn request_roundtrip() {
    let req = Request::new(Command::Destroy, "my-rig");
    let json = serde_json::to_string(&req).unwrap();
    let back: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(back, req);
}

#[test]
fn extra_omitted_when_none() {
    let req = Request::new(Command::Status, "r");
    let json = serde_json::to_string(&req).unwrap();
    assert!(!json.contains("extra"));
}

#[test]
fn unknown_command_rejected() {
    let err = serde_json::from_str::<Request>(r#"{"command":"halt","rig_name":"r"}"#);
    assert!(err.is_err());
}
