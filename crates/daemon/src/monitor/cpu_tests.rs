// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn config() -> RigConfig {
    serde_json::from_value(serde_json::json!({ "name": "t" })).unwrap()
}

fn build(yaml: &str) -> Result<CpuMonitor, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
    CpuMonitor::configure(&value, &config())
}

fn sample(user: u64, system: u64, idle: u64, iowait: u64) -> CpuSample {
    CpuSample {
        user,
        nice: 0,
        system,
        idle,
        iowait,
        steal: 0,
        guest: 0,
        guest_nice: 0,
        irq: 0,
        softirq: 0,
    }
}

#[test]
fn requires_at_least_one_metric() {
    let err = build("{}").unwrap_err();
    assert!(err.to_string().contains("at least one"));
}

#[test]
fn thresholds_capped_at_100() {
    assert!(build("percent: 101\n").is_err());
    assert!(build("iowait: 250\n").is_err());
    assert!(build("percent: 100\n").is_ok());
}

#[test]
fn negative_threshold_rejected() {
    assert!(build("steal: -5\n").is_err());
}

#[test]
fn unknown_metric_rejected() {
    assert!(build("idle: 10\n").is_err());
}

#[test]
fn percent_and_named_metrics_split() {
    let m = build("percent: 90\niowait: 30\nsteal: 10\n").unwrap();
    assert_eq!(m.percent, Some(90.0));
    assert_eq!(m.metrics.len(), 2);
}

#[test]
fn utilization_between_samples() {
    let prev = sample(100, 100, 800, 0);
    // +50 user, +30 system, +20 idle over the window: 80% busy
    let next = sample(150, 130, 820, 0);
    assert_eq!(utilization_between(&prev, &next), 80.0);
}

#[test]
fn iowait_counts_as_idle_for_utilization() {
    let prev = sample(0, 0, 0, 0);
    let next = sample(25, 0, 25, 50);
    assert_eq!(utilization_between(&prev, &next), 25.0);
}

#[test]
fn named_metric_fraction() {
    let prev = sample(0, 0, 0, 0);
    let next = sample(60, 20, 0, 20);
    assert_eq!(percent_between(&prev, &next, "iowait"), 20.0);
    assert_eq!(percent_between(&prev, &next, "user"), 60.0);
}

#[test]
fn zero_elapsed_time_reports_zero() {
    let s = sample(10, 10, 10, 10);
    assert_eq!(utilization_between(&s, &s), 0.0);
    assert_eq!(percent_between(&s, &s, "user"), 0.0);
}

#[test]
fn live_sample_reads() {
    // establishes that /proc/stat parsing works on the host running tests
    let sample = CpuSample::read().unwrap();
    assert!(sample.total() > 0);
}
