// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema and command-compilation tests. These only run where an `sos`
//! binary is installed, since configure checks for it up front.

use super::*;

fn config() -> RigConfig {
    serde_json::from_value(serde_json::json!({ "name": "t" })).unwrap()
}

fn build(yaml: &str) -> Result<SosAction, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
    SosAction::configure(&value, &config())
}

fn sos_available() -> bool {
    check_binary("sos").is_ok()
}

#[test]
fn report_and_collect_are_exclusive() {
    if !sos_available() {
        return;
    }
    let err = build("report: enabled\ncollect: enabled\n").unwrap_err();
    assert!(err.to_string().contains("Only one"));
}

#[test]
fn one_mode_is_required() {
    if !sos_available() {
        return;
    }
    let err = build("initial_archive: true\n").unwrap_err();
    assert!(err.to_string().contains("neither"));
}

#[test]
fn enabled_sentinel_builds_bare_command() {
    if !sos_available() {
        return;
    }
    let action = build("report: enabled\n").unwrap();
    assert_eq!(action.sos_cmd, "sos report --batch");
    assert_eq!(action.timeout.as_secs(), 300);
}

#[test]
fn report_options_render_as_flags() {
    if !sos_available() {
        return;
    }
    let action = build(
        r#"
report:
  case_id: "01234"
  only_plugins: [networking, kernel]
  plugin_option:
    networking.timeout: "60"
  verify: true
"#,
    )
    .unwrap();
    assert_eq!(
        action.sos_cmd,
        "sos report --batch --case-id 01234 --only-plugins networking,kernel \
         --plugin-option networking.timeout=60 --verify"
    );
}

#[test]
fn unknown_report_option_rejected() {
    if !sos_available() {
        return;
    }
    let err = build("report:\n  all_plugins: true\n").unwrap_err();
    assert!(err.to_string().contains("sos report"));
}

#[test]
fn unknown_collect_option_rejected() {
    if !sos_available() {
        return;
    }
    assert!(build("collect:\n  everywhere: true\n").is_err());
}

#[test]
fn clean_extends_timeout() {
    if !sos_available() {
        return;
    }
    let action = build("report:\n  clean: true\n").unwrap();
    assert_eq!(action.timeout.as_secs(), 480);
    assert!(action.sos_cmd.contains("--clean"));
}

#[test]
fn collect_options_accepted() {
    if !sos_available() {
        return;
    }
    let action = build(
        r#"
collect:
  nodes: [node1, node2]
  no_local: true
  ssh_user: root
"#,
    )
    .unwrap();
    assert!(action.sos_cmd.starts_with("sos collect --batch"));
    assert!(action.sos_cmd.contains("--nodes node1,node2"));
    assert!(action.sos_cmd.contains("--no-local"));
    assert!(action.sos_cmd.contains("--ssh-user root"));
    assert!(action.sos_cmd.contains("--timeout 300"));
}

#[test]
fn archive_path_recognizer() {
    assert!(is_sos_archive_path("/var/tmp/sosreport-host-2026-01-01.tar.xz"));
    assert!(is_sos_archive_path("sos-collector-run-1.tar.gz"));
    assert!(!is_sos_archive_path("Your sosreport has been generated and saved in:"));
    assert!(!is_sos_archive_path("/var/tmp/other-archive.tgz"));
}
