// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const MINIMAL: &str = r#"
name: demo
monitors:
  timer:
    timeout: 60
actions:
  noop:
    enabled: true
"#;

#[test]
fn minimal_rigfile_loads() {
    let rigfile = load_str(MINIMAL).unwrap();
    assert_eq!(rigfile.config.name, "demo");
    assert_eq!(rigfile.config.interval, 1);
    assert_eq!(rigfile.monitors.len(), 1);
    assert_eq!(rigfile.actions.len(), 1);
    assert!(rigfile.monitors.contains_key("timer"));
}

#[test]
fn rig_options_are_parsed() {
    let rigfile = load_str(
        r#"
name: tuned
interval: 5
delay: 2
repeat: 3
repeat_delay: 4
no_archive: true
monitors:
  timer: { timeout: 60 }
actions:
  noop: { enabled: true }
"#,
    )
    .unwrap();
    assert_eq!(rigfile.config.interval, 5);
    assert_eq!(rigfile.config.delay, 2);
    assert_eq!(rigfile.config.repeat, 3);
    assert_eq!(rigfile.config.repeat_delay, 4);
    assert!(rigfile.config.no_archive);
}

#[test]
fn missing_name_rejected() {
    let err = load_str("monitors:\n  timer: {timeout: 1}\nactions:\n  noop: {enabled: true}\n");
    assert!(err.is_err());
}

#[test]
fn unknown_top_level_key_rejected() {
    let doc = format!("{MINIMAL}\nfrequency: 10\n");
    assert!(matches!(load_str(&doc), Err(RigfileError::Parse(_))));
}

#[test]
fn zero_monitors_rejected() {
    let err = load_str("name: demo\nactions:\n  noop: {enabled: true}\n").unwrap_err();
    assert!(err.to_string().contains("monitor"));
}

#[test]
fn zero_actions_rejected() {
    let err = load_str("name: demo\nmonitors:\n  timer: {timeout: 1}\n").unwrap_err();
    assert!(err.to_string().contains("action"));
}

#[test]
fn null_monitor_config_rejected() {
    let err = load_str(
        "name: demo\nmonitors:\n  timer:\nactions:\n  noop: {enabled: true}\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("empty configuration"));
}

#[test]
fn scalar_action_config_rejected() {
    let err = load_str(
        "name: demo\nmonitors:\n  timer: {timeout: 1}\nactions:\n  noop: yes\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("mapping"));
}

#[test]
fn invalid_interval_rejected() {
    let doc = MINIMAL.replace("name: demo", "name: demo\ninterval: 0");
    assert!(load_str(&doc).is_err());
}

#[test]
fn load_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.yaml");
    std::fs::write(&path, MINIMAL).unwrap();
    let rigfile = load(&path).unwrap();
    assert_eq!(rigfile.config.name, "demo");
}

#[test]
fn missing_file_reports_path() {
    let err = load(Path::new("/nonexistent/rig.yaml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/rig.yaml"));
}

#[test]
fn monitor_order_is_preserved() {
    let rigfile = load_str(
        r#"
name: ordered
monitors:
  timer: { timeout: 60 }
  logs: { message: x }
  cpu: { percent: 90 }
actions:
  noop: { enabled: true }
"#,
    )
    .unwrap();
    let keys: Vec<_> = rigfile.monitors.keys().cloned().collect();
    assert_eq!(keys, vec!["timer", "logs", "cpu"]);
}
