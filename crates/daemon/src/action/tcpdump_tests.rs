// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn config() -> RigConfig {
    serde_json::from_value(serde_json::json!({ "name": "t" })).unwrap()
}

fn build(yaml: &str) -> Result<TcpdumpAction, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
    TcpdumpAction::configure(&value, &config())
}

fn tcpdump_available() -> bool {
    check_binary("tcpdump").is_ok()
}

#[test]
fn defaults_applied() {
    if !tcpdump_available() {
        return;
    }
    let action = build("interface: lo\n").unwrap();
    assert_eq!(action.capture_size, 10);
    assert_eq!(action.capture_count, 1);
    assert_eq!(action.snapshot_length, 0);
    assert!(action.expression.is_none());
    assert_eq!(action.priority(), 2);
    assert!(!action.repeatable());
}

#[test]
fn missing_interface_rejected() {
    if !tcpdump_available() {
        return;
    }
    let err = build("interface: does-not-exist0\n").unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn unknown_option_rejected() {
    if !tcpdump_available() {
        return;
    }
    assert!(build("interface: lo\npromiscuous: true\n").is_err());
}

#[tokio::test]
async fn malformed_expression_fails_fast_and_leaves_no_capture() {
    if !tcpdump_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut action =
        build("interface: lo\nexpression: 'port port port'\n").unwrap();
    let mut ctx = ActionCtx::new(config(), dir.path().to_path_buf());

    let err = action.pre_action(&mut ctx).await.unwrap_err();
    let message = err.to_string();
    assert!(
        message.contains("port port port"),
        "error should name the expression: {message}"
    );
    assert!(action.capture.is_none(), "no background capture may remain");
}

#[test]
fn hostname_is_nonempty() {
    assert!(!hostname().is_empty());
}
