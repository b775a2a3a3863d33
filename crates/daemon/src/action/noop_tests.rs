// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn config() -> RigConfig {
    serde_json::from_value(serde_json::json!({ "name": "t" })).unwrap()
}

#[test]
fn enabled_true_required() {
    let value: serde_yaml::Value = serde_yaml::from_str("enabled: true").unwrap();
    assert!(NoopAction::configure(&value, &config()).is_ok());

    let value: serde_yaml::Value = serde_yaml::from_str("enabled: false").unwrap();
    assert!(NoopAction::configure(&value, &config()).is_err());

    let value: serde_yaml::Value = serde_yaml::from_str("{}").unwrap();
    assert!(NoopAction::configure(&value, &config()).is_err());
}

#[tokio::test]
async fn trigger_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str("enabled: true").unwrap();
    let mut action = NoopAction::configure(&value, &config()).unwrap();
    let mut ctx = ActionCtx::new(config(), dir.path().to_path_buf());
    action.trigger(&mut ctx).await.unwrap();
    assert!(ctx.files().is_empty());
}
