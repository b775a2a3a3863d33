// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn ok_response_roundtrip() {
    let resp = Response::ok(Command::Trigger, json!("triggered"));
    let encoded = serde_json::to_string(&resp).unwrap();
    let back: Response = serde_json::from_str(&encoded).unwrap();
    assert_eq!(back, resp);
    assert!(back.success);
}

#[test]
fn error_response_carries_message() {
    let resp = Response::error(Command::Destroy, "teardown already underway");
    assert!(!resp.success);
    assert_eq!(resp.result, json!("teardown already underway"));
}

#[test]
fn describe_payload_roundtrip() {
    let desc = RigDescription {
        name: "net-drop".to_string(),
        status: rig_core::RigStatus::Running,
        start_time: "2026-01-01T00:00:00Z".to_string(),
        monitors: vec![json!({"type": "timer", "monitoring": {"timeout": 60}})],
        actions: vec![json!({"type": "noop", "produces": "nothing"})],
        configuration: json!({"interval": 1}),
    };
    let resp = Response::ok(Command::Describe, serde_json::to_value(&desc).unwrap());
    let back: RigDescription = serde_json::from_value(back_result(resp)).unwrap();
    assert_eq!(back, desc);
}

fn back_result(resp: Response) -> serde_json::Value {
    let encoded = serde_json::to_string(&resp).unwrap();
    let decoded: Response = serde_json::from_str(&encoded).unwrap();
    decoded.result
}
