// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run the sos diagnostic collector when the rig triggers.
//!
//! Supports local `report` mode and multi-node `collect` mode, mutually
//! exclusive, each with a closed option schema: unknown keys fail at
//! configure time. With `initial_archive: true` a baseline collection
//! labelled `initial` is taken before monitoring begins, giving a
//! before/after pair around the trigger event.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use rig_core::{ConfigError, RigConfig, SubprocessError};

use super::exec::run_command;
use super::{check_binary, Action, ActionCtx, ActionError};
use crate::options;

fn default_timeout() -> u64 {
    300
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SosOptions {
    #[serde(default)]
    report: Option<serde_yaml::Value>,
    #[serde(default)]
    collect: Option<serde_yaml::Value>,
    /// Take a baseline collection before monitoring starts
    #[serde(default)]
    initial_archive: bool,
    /// Seconds to allow each sos invocation
    #[serde(default = "default_timeout")]
    timeout: u64,
}

/// Options accepted in `report` mode.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReportOptions {
    #[serde(default)]
    case_id: Option<String>,
    #[serde(default)]
    clean: Option<bool>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    only_plugins: Vec<String>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    skip_plugins: Vec<String>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    enable_plugins: Vec<String>,
    #[serde(default)]
    plugin_option: BTreeMap<String, String>,
    #[serde(default)]
    log_size: Option<u64>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    skip_commands: Vec<String>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    skip_files: Vec<String>,
    #[serde(default)]
    verify: Option<bool>,
}

/// Options accepted in `collect` mode, a superset of report's. The
/// shared fields are spelled out again because `deny_unknown_fields`
/// does not compose with `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CollectOptions {
    #[serde(default)]
    case_id: Option<String>,
    #[serde(default)]
    clean: Option<bool>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    only_plugins: Vec<String>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    skip_plugins: Vec<String>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    enable_plugins: Vec<String>,
    #[serde(default)]
    plugin_option: BTreeMap<String, String>,
    #[serde(default)]
    log_size: Option<u64>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    skip_commands: Vec<String>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    skip_files: Vec<String>,
    #[serde(default)]
    verify: Option<bool>,
    #[serde(default)]
    primary: Option<String>,
    #[serde(default)]
    cluster_type: Option<String>,
    #[serde(default)]
    cluster_option: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "options::one_or_many")]
    nodes: Vec<String>,
    #[serde(default)]
    no_local: Option<bool>,
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    ssh_user: Option<String>,
    #[serde(default)]
    transport: Option<String>,
}

impl CollectOptions {
    fn report_options(&self) -> ReportOptions {
        ReportOptions {
            case_id: self.case_id.clone(),
            clean: self.clean,
            only_plugins: self.only_plugins.clone(),
            skip_plugins: self.skip_plugins.clone(),
            enable_plugins: self.enable_plugins.clone(),
            plugin_option: self.plugin_option.clone(),
            log_size: self.log_size,
            skip_commands: self.skip_commands.clone(),
            skip_files: self.skip_files.clone(),
            verify: self.verify,
        }
    }
}

/// Command-line fragments compiled from the validated options.
#[derive(Debug, Default)]
struct SosArgs(Vec<String>);

impl SosArgs {
    fn flag(&mut self, key: &str, set: Option<bool>) {
        if set == Some(true) {
            self.0.push(format!("--{key}"));
        }
    }

    fn value<T: std::fmt::Display>(&mut self, key: &str, value: Option<T>) {
        if let Some(v) = value {
            self.0.push(format!("--{key} {v}"));
        }
    }

    fn list(&mut self, key: &str, values: &[String]) {
        if !values.is_empty() {
            self.0.push(format!("--{key} {}", values.join(",")));
        }
    }

    fn map(&mut self, key: &str, values: &BTreeMap<String, String>) {
        if !values.is_empty() {
            let rendered: Vec<String> =
                values.iter().map(|(k, v)| format!("{k}={v}")).collect();
            self.0.push(format!("--{key} {}", rendered.join(",")));
        }
    }
}

#[derive(Debug)]
pub struct SosAction {
    sos_cmd: String,
    initial_archive: bool,
    timeout: Duration,
}

/// A mode's value may be the bare enablement sentinel or an option map.
fn mode_enabled(value: &serde_yaml::Value) -> bool {
    match value {
        serde_yaml::Value::Bool(true) => true,
        serde_yaml::Value::String(s) => matches!(s.as_str(), "true" | "enabled" | "on"),
        _ => false,
    }
}

impl SosAction {
    pub fn configure(value: &serde_yaml::Value, _config: &RigConfig) -> Result<Self, ConfigError> {
        check_binary("sos")?;
        let opts: SosOptions = options::from_value("action", "sos", value)?;

        let mut timeout = opts.timeout;
        let sos_cmd = match (&opts.report, &opts.collect) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "sos action: both 'report' and 'collect' defined. Only one is supported at \
                     a time."
                        .to_string(),
                ))
            }
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "sos action: neither 'report' nor 'collect' defined, or configuration is \
                     empty. Provide configuration or set to 'enabled'."
                        .to_string(),
                ))
            }
            (Some(report), None) => {
                let parsed: ReportOptions = if mode_enabled(report) {
                    ReportOptions::default()
                } else {
                    options::from_value("action", "sos report", report)?
                };
                if parsed.clean == Some(true) {
                    // allow extra time for obfuscation
                    timeout += 180;
                }
                Self::compile_command("report", &parsed, None)
            }
            (None, Some(collect)) => {
                let parsed: CollectOptions = if mode_enabled(collect) {
                    CollectOptions::default()
                } else {
                    options::from_value("action", "sos collect", collect)?
                };
                if parsed.clean == Some(true) {
                    timeout += 180;
                }
                let timeout_opt = Some(parsed.timeout.unwrap_or(timeout));
                Self::compile_command(
                    "collect",
                    &parsed.report_options(),
                    Some((&parsed, timeout_opt)),
                )
            }
        };

        debug!("sos command set to '{sos_cmd}'");
        Ok(Self {
            sos_cmd,
            initial_archive: opts.initial_archive,
            timeout: Duration::from_secs(timeout),
        })
    }

    fn compile_command(
        mode: &str,
        report: &ReportOptions,
        collect: Option<(&CollectOptions, Option<u64>)>,
    ) -> String {
        let mut args = SosArgs::default();
        args.value("case-id", report.case_id.as_ref());
        args.flag("clean", report.clean);
        args.list("only-plugins", &report.only_plugins);
        args.list("skip-plugins", &report.skip_plugins);
        args.list("enable-plugins", &report.enable_plugins);
        args.map("plugin-option", &report.plugin_option);
        args.value("log-size", report.log_size);
        args.list("skip-commands", &report.skip_commands);
        args.list("skip-files", &report.skip_files);
        args.flag("verify", report.verify);

        if let Some((collect, timeout)) = collect {
            args.value("primary", collect.primary.as_ref());
            args.value("cluster-type", collect.cluster_type.as_ref());
            args.map("cluster-option", &collect.cluster_option);
            args.list("nodes", &collect.nodes);
            args.flag("no-local", collect.no_local);
            args.value("timeout", timeout);
            args.value("ssh-user", collect.ssh_user.as_ref());
            args.value("transport", collect.transport.as_ref());
        }

        let mut cmd = format!("sos {mode} --batch");
        for fragment in args.0 {
            cmd.push(' ');
            cmd.push_str(&fragment);
        }
        cmd
    }

    /// Run one collection and register the archive sos reports on stdout.
    async fn execute_sos_cmd(
        &self,
        label: Option<&str>,
        ctx: &mut ActionCtx,
    ) -> Result<bool, ActionError> {
        let mut cmd = self.sos_cmd.clone();
        if let Some(label) = label {
            cmd.push_str(&format!(" --label {label}"));
        }
        let ret = match run_command(&cmd, self.timeout).await {
            Ok(ret) => ret,
            // a nonzero sos exit degrades this collection, not the rig
            Err(SubprocessError::Failed { stdout, stderr, .. }) => {
                let detail = if stderr.is_empty() {
                    stdout.lines().rev().take(3).collect::<Vec<_>>().join(" ")
                } else {
                    stderr
                };
                error!("Error running sos command, output was: {detail}");
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        };

        let path = ret
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| is_sos_archive_path(line));
        match path {
            Some(path) => {
                ctx.add_archive_file(std::path::Path::new(path));
                Ok(true)
            }
            None => {
                error!("Could not determine final path of sos archive");
                Ok(false)
            }
        }
    }
}

/// Matches the `*sos*-*.tar.*` shape sos prints for its final archive.
fn is_sos_archive_path(line: &str) -> bool {
    !line.contains(char::is_whitespace)
        && line.contains("sos")
        && line.contains('-')
        && line.contains(".tar.")
}

#[async_trait]
impl Action for SosAction {
    fn name(&self) -> &'static str {
        "sos"
    }

    fn produces(&self) -> serde_json::Value {
        json!("an sos report tarball for this system")
    }

    async fn pre_action(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        if !self.initial_archive {
            return Ok(());
        }
        info!("Generating initial sos archive, this may take some time");
        if self.execute_sos_cmd(Some("initial"), ctx).await? {
            info!("Initial sos archive successfully collected");
            Ok(())
        } else {
            Err(ActionError::Failed(
                "initial sos archive failed to be collected".to_string(),
            ))
        }
    }

    async fn trigger(&mut self, ctx: &mut ActionCtx) -> Result<(), ActionError> {
        info!("Collecting sos archive as '{}'", self.sos_cmd);
        if self.execute_sos_cmd(None, ctx).await? {
            info!("sos archive successfully collected");
            Ok(())
        } else {
            Err(ActionError::Failed("sos archive failed to be collected".to_string()))
        }
    }
}

#[cfg(test)]
#[path = "sos_tests.rs"]
mod tests;
