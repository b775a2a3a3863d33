// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

fn ctx(tmpdir: &Path, repeat: u64) -> ActionCtx {
    let config: RigConfig = serde_json::from_value(serde_json::json!({
        "name": "t",
        "repeat": repeat,
    }))
    .unwrap();
    ActionCtx::new(config, tmpdir.to_path_buf())
}

/// Instrumented action for exercising the wrapper.
#[derive(Debug)]
struct Probe {
    repeatable: bool,
    fail_trigger: bool,
    triggers: Arc<AtomicUsize>,
    posts: Arc<AtomicUsize>,
    cleanups: Arc<AtomicUsize>,
}

impl Probe {
    fn new(repeatable: bool, fail_trigger: bool) -> Self {
        Self {
            repeatable,
            fail_trigger,
            triggers: Arc::new(AtomicUsize::new(0)),
            posts: Arc::new(AtomicUsize::new(0)),
            cleanups: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Action for Probe {
    fn name(&self) -> &'static str {
        "probe"
    }

    fn repeatable(&self) -> bool {
        self.repeatable
    }

    fn produces(&self) -> serde_json::Value {
        serde_json::json!("nothing")
    }

    async fn trigger(&mut self, _ctx: &mut ActionCtx) -> Result<(), ActionError> {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        if self.fail_trigger {
            return Err(ActionError::Failed("boom".to_string()));
        }
        Ok(())
    }

    async fn post_action(&mut self, _ctx: &mut ActionCtx) -> Result<(), ActionError> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cleanup(&mut self, _ctx: &mut ActionCtx) -> Result<(), ActionError> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn trigger_runs_once_without_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let mut probe = Probe::new(true, false);
    let mut ctx = ctx(dir.path(), 0);
    trigger_action(&mut probe, &mut ctx).await.unwrap();
    assert_eq!(probe.triggers.load(Ordering::SeqCst), 1);
    assert_eq!(probe.posts.load(Ordering::SeqCst), 1);
    assert_eq!(probe.cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn repeatable_action_runs_one_plus_repeat_times() {
    let dir = tempfile::tempdir().unwrap();
    let mut probe = Probe::new(true, false);
    let mut ctx = ctx(dir.path(), 2);
    ctx.config.repeat_delay = 1;
    // paused time auto-advances through both repeat delays
    trigger_action(&mut probe, &mut ctx).await.unwrap();
    assert_eq!(probe.triggers.load(Ordering::SeqCst), 3);
    assert_eq!(probe.posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_repeatable_action_ignores_repeat_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut probe = Probe::new(false, false);
    let mut ctx = ctx(dir.path(), 5);
    trigger_action(&mut probe, &mut ctx).await.unwrap();
    assert_eq!(probe.triggers.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cleanup_runs_even_when_trigger_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut probe = Probe::new(false, true);
    let mut ctx = ctx(dir.path(), 0);
    assert!(trigger_action(&mut probe, &mut ctx).await.is_err());
    assert_eq!(probe.cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(probe.posts.load(Ordering::SeqCst), 0, "post_action skipped on failure");
}

#[test]
fn archive_file_inside_tmpdir_kept_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ctx(dir.path(), 0);
    let inside = dir.path().join("data.txt");
    std::fs::write(&inside, "x").unwrap();
    ctx.add_archive_file(&inside);
    assert_eq!(ctx.files(), &[inside]);
}

#[test]
fn archive_file_outside_tmpdir_moved_in() {
    let tmpdir = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let mut ctx = ctx(tmpdir.path(), 0);

    let produced = elsewhere.path().join("report.tar");
    std::fs::write(&produced, "x").unwrap();
    ctx.add_archive_file(&produced);

    let dest = tmpdir.path().join("report.tar");
    assert!(dest.exists());
    assert!(!produced.exists());
    assert_eq!(ctx.files(), &[dest]);
}

#[test]
fn finish_execution_drains_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ctx(dir.path(), 0);
    let file = dir.path().join("a");
    std::fs::write(&file, "x").unwrap();
    ctx.add_archive_file(&file);
    let drained = ctx.finish_execution("probe");
    assert_eq!(drained.len(), 1);
    assert!(ctx.files().is_empty());
}

#[test]
fn check_binary_finds_sh() {
    assert!(check_binary("sh").is_ok());
}

#[test]
fn check_binary_reports_missing() {
    let err = check_binary("definitely-not-a-real-binary").unwrap_err();
    assert!(err.to_string().contains("not found"));
}
