// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;

fn config() -> RigConfig {
    serde_json::from_value(serde_json::json!({ "name": "t" })).unwrap()
}

fn build(yaml: &str) -> Result<TimerMonitor, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
    TimerMonitor::configure(&value, &config())
}

#[test]
fn integer_timeout_accepted() {
    let timer = build("timeout: 90\n").unwrap();
    assert_eq!(timer.timeout, Duration::from_secs(90));
    assert!(timer.trigger_on_expiry);
}

#[test]
fn suffixed_timeout_accepted() {
    let timer = build("timeout: 1h30m\n").unwrap();
    assert_eq!(timer.timeout, Duration::from_secs(5400));
}

#[test]
fn zero_timeout_rejected() {
    assert!(build("timeout: 0\n").is_err());
}

#[test]
fn unparseable_timeout_rejected() {
    assert!(build("timeout: eventually\n").is_err());
}

#[test]
fn unknown_option_rejected() {
    assert!(build("timeout: 5\nexpires: true\n").is_err());
}

#[tokio::test]
async fn expiry_triggers_by_default() {
    let value: serde_yaml::Value = serde_yaml::from_str("timeout: 1\n").unwrap();
    let mut timer = TimerMonitor::configure(&value, &config()).unwrap();
    timer.timeout = Duration::from_millis(20);
    match timer.start(Duration::from_secs(1)).await.unwrap() {
        MonitorOutcome::Triggered(reason) => assert!(reason.contains("expired")),
        other => panic!("expected trigger, got {other:?}"),
    }
}

#[tokio::test]
async fn expiry_cancels_when_configured() {
    let value: serde_yaml::Value =
        serde_yaml::from_str("timeout: 1\ntrigger_on_expiry: false\n").unwrap();
    let mut timer = TimerMonitor::configure(&value, &config()).unwrap();
    timer.timeout = Duration::from_millis(20);
    match timer.start(Duration::from_secs(1)).await.unwrap() {
        MonitorOutcome::Cancelled(reason) => assert!(reason.contains("trigger_on_expiry")),
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[test]
fn monitoring_reports_original_spelling() {
    let timer = build("timeout: 2h\n").unwrap();
    assert_eq!(timer.monitoring()["timeout"], "2h");
}
