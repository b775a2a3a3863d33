// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle tests: the trigger race, the action pipeline, and teardown
//! totality across every terminal path.

use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::action::ActionError;
use crate::monitor::{MonitorOutcome as MonOutcome, MonitorResult};
use rig_wire::{decode, encode, read_message, write_message, Command, Request, Response};

struct TestPaths {
    _run: tempfile::TempDir,
    _tmp: tempfile::TempDir,
    _archive: tempfile::TempDir,
    paths: Paths,
}

fn paths() -> TestPaths {
    let run = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let archive = tempfile::tempdir().unwrap();
    let paths = Paths {
        run_dir: run.path().to_path_buf(),
        tmp_dir: tmp.path().to_path_buf(),
        archive_dir: archive.path().to_path_buf(),
        log_dir: tmp.path().to_path_buf(),
    };
    TestPaths { _run: run, _tmp: tmp, _archive: archive, paths }
}

fn archives_in(dir: &std::path::Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with(".tar.gz"))
        .collect()
}

// ---------------------------------------------------------------------------
// Instrumented monitors and actions
// ---------------------------------------------------------------------------

/// Monitor that never fires.
struct Never;

#[async_trait]
impl Monitor for Never {
    fn name(&self) -> &'static str {
        "never"
    }
    fn monitoring(&self) -> serde_json::Value {
        json!("nothing")
    }
    async fn start(&self, _interval: Duration) -> MonitorResult {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(MonOutcome::Cancelled("unreachable".to_string()))
    }
}

/// Monitor that fires immediately.
struct Instant;

#[async_trait]
impl Monitor for Instant {
    fn name(&self) -> &'static str {
        "instant"
    }
    fn monitoring(&self) -> serde_json::Value {
        json!("nothing")
    }
    async fn start(&self, _interval: Duration) -> MonitorResult {
        Ok(MonOutcome::Triggered("fired immediately".to_string()))
    }
}

#[derive(Clone, Default)]
struct Counters {
    pre_actions: Arc<AtomicUsize>,
    triggers: Arc<AtomicUsize>,
    cleanups: Arc<AtomicUsize>,
}

/// Action that counts its lifecycle hooks and optionally registers a
/// file or records the pipeline order it ran in.
struct Probe {
    label: &'static str,
    priority: i32,
    counters: Counters,
    fail_pre: bool,
    write_file: bool,
    order: Option<Arc<parking_lot::Mutex<Vec<&'static str>>>>,
}

impl Probe {
    fn new(label: &'static str, counters: Counters) -> Self {
        Self {
            label,
            priority: 100,
            counters,
            fail_pre: false,
            write_file: false,
            order: None,
        }
    }
}

#[async_trait]
impl Action for Probe {
    fn name(&self) -> &'static str {
        self.label
    }
    fn priority(&self) -> i32 {
        self.priority
    }
    fn produces(&self) -> serde_json::Value {
        json!("test data")
    }
    async fn pre_action(&mut self, _ctx: &mut ActionCtx) -> Result<(), ActionError> {
        self.counters.pre_actions.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_pre {
            return Err(ActionError::Failed("pre-action refused".to_string()));
        }
        Ok(())
    }
    async fn trigger(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        self.counters.triggers.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(order) = &self.order {
            order.lock().push(self.label);
        }
        if self.write_file {
            let path = ctx.tmpdir.join(format!("{}.txt", self.label));
            std::fs::write(&path, self.label)?;
            ctx.add_archive_file(&path);
        }
        Ok(())
    }
    async fn cleanup(&mut self, _ctx: &mut ActionCtx) -> Result<(), ActionError> {
        self.counters.cleanups.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}

fn test_rig(
    test_paths: &TestPaths,
    name: &str,
    monitors: Vec<Arc<dyn Monitor>>,
    actions: Vec<Box<dyn Action>>,
) -> Rig {
    let config: RigConfig =
        serde_json::from_value(json!({ "name": name, "interval": 1 })).unwrap();
    let tmpdir = test_paths.paths.tmp_dir.join(format!("rig.{name}"));
    std::fs::create_dir(&tmpdir).unwrap();
    let mut actions = actions;
    actions.sort_by_key(|a| a.priority());
    let kdump_configured = actions.iter().any(|a| a.name() == "kdump");
    let cleaned = vec![false; actions.len()];
    let shared = Arc::new(RigShared {
        monitors_info: monitors
            .iter()
            .map(|m| json!({"type": m.name(), "monitoring": m.monitoring()}))
            .collect(),
        actions_info: actions
            .iter()
            .map(|a| json!({"type": a.name(), "produces": a.produces()}))
            .collect(),
        config,
        manual_trigger: std::sync::atomic::AtomicBool::new(false),
        status: Mutex::new(RigStatus::Initializing),
        start_time: chrono::Utc::now(),
    });
    Rig {
        shared,
        monitors,
        actions,
        cleaned,
        tmpdir,
        paths: test_paths.paths.clone(),
        kdump_configured,
    }
}

async fn send_request(socket: &std::path::Path, request: &Request) -> Response {
    let mut stream = tokio::net::UnixStream::connect(socket).await.unwrap();
    let bytes = encode(request).unwrap();
    write_message(&mut stream, &bytes).await.unwrap();
    let raw = read_message(&mut stream).await.unwrap();
    decode(&raw).unwrap()
}

async fn wait_for_socket(path: &std::path::Path) {
    for _ in 0..100 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("socket {} never appeared", path.display());
}

// ---------------------------------------------------------------------------
// Rigfile-driven lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timer_trigger_produces_archive() {
    let test_paths = paths();
    let watched = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(watched.path(), "observed\n").unwrap();

    let rigfile = rig_rigfile::load_str(&format!(
        r#"
name: demo
monitors:
  timer:
    timeout: 1
actions:
  watch:
    files:
      - path: {}
"#,
        watched.path().display()
    ))
    .unwrap();

    let rig = Rig::build(rigfile, &test_paths.paths).unwrap();
    let tmpdir = rig.tmpdir().clone();
    let socket = test_paths.paths.run_dir.join("demo");

    let exit = rig.run().await.unwrap();
    assert_eq!(exit, 0);

    let archives = archives_in(&test_paths.paths.archive_dir);
    assert_eq!(archives.len(), 1);
    let fname = archives[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(fname.starts_with("rig-demo-"));

    // teardown totality
    assert!(!tmpdir.exists(), "tmpdir must be removed after archiving");
    assert!(!socket.exists(), "control socket must be removed");
}

#[tokio::test]
async fn timer_cancellation_skips_archive() {
    let test_paths = paths();
    let rigfile = rig_rigfile::load_str(
        r#"
name: watchdog
monitors:
  timer:
    timeout: 1
    trigger_on_expiry: false
actions:
  noop:
    enabled: true
"#,
    )
    .unwrap();

    let rig = Rig::build(rigfile, &test_paths.paths).unwrap();
    let tmpdir = rig.tmpdir().clone();
    let socket = test_paths.paths.run_dir.join("watchdog");

    let exit = rig.run().await.unwrap();
    assert_eq!(exit, 0);
    assert!(archives_in(&test_paths.paths.archive_dir).is_empty());
    assert!(!tmpdir.exists());
    assert!(!socket.exists());
}

#[tokio::test]
async fn duplicate_tmpdir_refused() {
    let test_paths = paths();
    std::fs::create_dir(test_paths.paths.tmp_dir.join("rig.demo")).unwrap();
    let rigfile = rig_rigfile::load_str(
        "name: demo\nmonitors:\n  timer: {timeout: 1}\nactions:\n  noop: {enabled: true}\n",
    )
    .unwrap();
    assert!(Rig::build(rigfile, &test_paths.paths).is_err());
}

// ---------------------------------------------------------------------------
// Trigger race properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_trigger_with_racing_monitors() {
    let test_paths = paths();
    let counters = Counters::default();
    let rig = test_rig(
        &test_paths,
        "race",
        vec![Arc::new(Instant), Arc::new(Instant), Arc::new(Instant)],
        vec![Box::new(Probe::new("probe", counters.clone()))],
    );
    let exit = rig.run().await.unwrap();
    assert_eq!(exit, 0);
    // three monitors fired, the pipeline ran exactly once
    assert_eq!(counters.triggers.load(AtomicOrdering::SeqCst), 1);
    assert_eq!(counters.cleanups.load(AtomicOrdering::SeqCst), 1);
}

#[tokio::test]
async fn destroy_preempts_trigger() {
    let test_paths = paths();
    let counters = Counters::default();
    let rig = test_rig(
        &test_paths,
        "victim",
        vec![Arc::new(Never)],
        vec![Box::new(Probe::new("probe", counters.clone()))],
    );
    let socket = test_paths.paths.run_dir.join("victim");
    let tmpdir = rig.tmpdir.clone();

    let running = tokio::spawn(rig.run());
    wait_for_socket(&socket).await;

    let response = send_request(&socket, &Request::new(Command::Destroy, "victim")).await;
    assert!(response.success);

    let exit = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("rig should exit after destroy")
        .unwrap()
        .unwrap();
    assert_eq!(exit, 0);

    // no trigger ran, cleanup still did, nothing archived
    assert_eq!(counters.triggers.load(AtomicOrdering::SeqCst), 0);
    assert_eq!(counters.cleanups.load(AtomicOrdering::SeqCst), 1);
    assert!(archives_in(&test_paths.paths.archive_dir).is_empty());
    assert!(!socket.exists());
    assert!(!tmpdir.exists());
}

#[tokio::test]
async fn manual_trigger_runs_actions() {
    let test_paths = paths();
    let counters = Counters::default();
    let rig = test_rig(
        &test_paths,
        "manual",
        vec![Arc::new(Never)],
        vec![Box::new(Probe::new("probe", counters.clone()))],
    );
    let socket = test_paths.paths.run_dir.join("manual");

    let running = tokio::spawn(rig.run());
    wait_for_socket(&socket).await;

    let response = send_request(&socket, &Request::new(Command::Trigger, "manual")).await;
    assert!(response.success);

    let exit = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("rig should trigger after the manual request")
        .unwrap()
        .unwrap();
    assert_eq!(exit, 0);
    assert_eq!(counters.triggers.load(AtomicOrdering::SeqCst), 1);
}

#[tokio::test]
async fn status_moves_through_running() {
    let test_paths = paths();
    let counters = Counters::default();
    let rig = test_rig(
        &test_paths,
        "stately",
        vec![Arc::new(Never)],
        vec![Box::new(Probe::new("probe", counters))],
    );
    let socket = test_paths.paths.run_dir.join("stately");

    let running = tokio::spawn(rig.run());
    wait_for_socket(&socket).await;

    let response = send_request(&socket, &Request::new(Command::Status, "stately")).await;
    assert_eq!(response.result, json!("Running"));

    send_request(&socket, &Request::new(Command::Destroy, "stately")).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), running).await;
}

// ---------------------------------------------------------------------------
// Action pipeline ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn actions_run_in_ascending_priority_with_kdump_last() {
    let test_paths = paths();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let counters = Counters::default();

    let mut first = Probe::new("first", counters.clone());
    first.priority = 1;
    first.order = Some(Arc::clone(&order));
    first.write_file = true;

    let mut second = Probe::new("second", counters.clone());
    second.priority = 50;
    second.order = Some(Arc::clone(&order));

    // a kdump-class action configured with a low priority must still be
    // deferred past the archive
    let mut crash = Probe::new("kdump", counters.clone());
    crash.priority = 0;
    crash.order = Some(Arc::clone(&order));

    let rig = test_rig(
        &test_paths,
        "ordered",
        vec![Arc::new(Instant)],
        vec![Box::new(second), Box::new(crash), Box::new(first)],
    );
    let exit = rig.run().await.unwrap();
    assert_eq!(exit, 0);

    assert_eq!(*order.lock(), vec!["first", "second", "kdump"]);
    // the archive existed before kdump ran: first's file got archived
    assert_eq!(archives_in(&test_paths.paths.archive_dir).len(), 1);
}

#[tokio::test]
async fn no_archive_option_suppresses_archive() {
    let test_paths = paths();
    let counters = Counters::default();
    let mut writer = Probe::new("writer", counters.clone());
    writer.write_file = true;

    let mut rig = test_rig(
        &test_paths,
        "quiet",
        vec![Arc::new(Instant)],
        vec![Box::new(writer)],
    );
    Arc::get_mut(&mut rig.shared).unwrap().config.no_archive = true;

    let exit = rig.run().await.unwrap();
    assert_eq!(exit, 0);
    assert_eq!(counters.triggers.load(AtomicOrdering::SeqCst), 1);
    assert!(archives_in(&test_paths.paths.archive_dir).is_empty());
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pre_action_failure_is_fatal_and_torn_down() {
    let test_paths = paths();
    let counters = Counters::default();
    let mut failing = Probe::new("failing", counters.clone());
    failing.fail_pre = true;

    let rig = test_rig(
        &test_paths,
        "doomed",
        vec![Arc::new(Never)],
        vec![Box::new(failing)],
    );
    let socket = test_paths.paths.run_dir.join("doomed");
    let tmpdir = rig.tmpdir.clone();

    let exit = rig.run().await.unwrap();
    assert_eq!(exit, 1);
    assert_eq!(counters.triggers.load(AtomicOrdering::SeqCst), 0);
    assert_eq!(counters.cleanups.load(AtomicOrdering::SeqCst), 1);
    assert!(!socket.exists());
    assert!(!tmpdir.exists());
}
