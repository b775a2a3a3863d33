// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small deserialization helpers shared by monitor and action option
//! structs.
//!
//! Rigfiles are hand-written, so several options accept either a scalar
//! or a list (`files: /var/log/messages` vs `files: [a, b]`), and sizes
//! accept either a bare integer or a suffixed string (`1024` vs `"1K"`).

use serde::{Deserialize, Deserializer};

use rig_core::error::ConfigError;
use rig_core::units::parse_bytes;

/// A value users may write as a single item or a sequence of items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// Deserialize an optional scalar-or-list into a plain `Vec`.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<OneOrMany<T>>::deserialize(deserializer)?
        .map(OneOrMany::into_vec)
        .unwrap_or_default())
}

/// A byte size written either as an integer or a suffixed string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    Bytes(u64),
    Human(String),
}

impl SizeSpec {
    pub fn to_bytes(&self) -> Result<u64, ConfigError> {
        match self {
            SizeSpec::Bytes(n) => Ok(*n),
            SizeSpec::Human(s) => parse_bytes(s),
        }
    }

    /// The size as the user wrote it, for describe output.
    pub fn display(&self) -> String {
        match self {
            SizeSpec::Bytes(n) => n.to_string(),
            SizeSpec::Human(s) => s.clone(),
        }
    }
}

/// Identifier that may arrive as a number or a string (PIDs, process
/// names, journal units).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NameOrNumber {
    Number(i64),
    Name(String),
}

impl NameOrNumber {
    pub fn into_string(self) -> String {
        match self {
            NameOrNumber::Number(n) => n.to_string(),
            NameOrNumber::Name(s) => s,
        }
    }
}

/// Decode an option struct from the raw YAML mapping a rigfile supplied,
/// rejecting unknown keys with the monitor/action name in the error.
pub fn from_value<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    name: &str,
    value: &serde_yaml::Value,
) -> Result<T, ConfigError> {
    serde_yaml::from_value(value.clone()).map_err(|source| ConfigError::BadOptions {
        kind,
        name: name.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
