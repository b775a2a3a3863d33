// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-friendly size and duration parsing.
//!
//! Sizes use binary powers of 1024 with single-letter suffixes
//! (`B`, `K`, `M`, `G`, `T`, `P`). Durations accept a bare number of
//! seconds or a string of suffixed terms (`s`, `m`, `h`, `d`, `w`) which
//! are summed, so `"1d 2h 30m"` works.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConfigError;

const UNITS: &[(char, u64)] = &[
    ('B', 1),
    ('K', 1 << 10),
    ('M', 1 << 20),
    ('G', 1 << 30),
    ('T', 1 << 40),
    ('P', 1 << 50),
];

/// Parse a size like `"512"`, `"1K"`, or `"2.5G"` into bytes.
pub fn parse_bytes(val: &str) -> Result<u64, ConfigError> {
    let val = val.trim();
    if val.is_empty() {
        return Err(ConfigError::invalid("size", "empty size value"));
    }
    let (num, unit) = match val.chars().last() {
        Some(c) if c.is_ascii_digit() => (val, 1u64),
        Some(c) => {
            let mult = UNITS
                .iter()
                .find(|(u, _)| *u == c.to_ascii_uppercase())
                .map(|(_, m)| *m)
                .ok_or_else(|| {
                    ConfigError::invalid("size", format!("unknown unit '{c}'"))
                })?;
            (&val[..val.len() - c.len_utf8()], mult)
        }
        None => return Err(ConfigError::invalid("size", "empty size value")),
    };
    let size: f64 = num
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid("size", format!("invalid size '{num}'")))?;
    if size < 0.0 {
        return Err(ConfigError::invalid("size", "size must not be negative"));
    }
    Ok((size * unit as f64) as u64)
}

/// Format a byte count with the largest suffix it fills.
pub fn format_bytes(size: u64) -> String {
    for (unit, base) in UNITS.iter().rev() {
        if size >= *base {
            let scaled = (size as f64 / *base as f64 * 100.0).round() / 100.0;
            return format!("{scaled}{unit}");
        }
    }
    format!("{size}B")
}

#[allow(clippy::unwrap_used)] // the pattern is a literal
fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?P<val>\d+(\.\d+)?)\s*(?P<unit>[smhdw]?)").unwrap())
}

/// Parse a duration like `60`, `"90s"`, or `"1d 2h 30m"` into seconds.
/// Terms are summed; a term with no suffix counts as seconds.
pub fn parse_duration(timestr: &str) -> Result<u64, ConfigError> {
    let mut total = 0.0f64;
    let mut matched = false;
    for cap in duration_re().captures_iter(timestr) {
        matched = true;
        let val: f64 = cap["val"]
            .parse()
            .map_err(|_| ConfigError::invalid("timeout", format!("invalid value in '{timestr}'")))?;
        let mult = match cap["unit"].to_ascii_lowercase().as_str() {
            "" | "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "d" => 86400.0,
            "w" => 604800.0,
            // unreachable per the pattern's character class
            other => {
                return Err(ConfigError::invalid(
                    "timeout",
                    format!("unknown unit '{other}'"),
                ))
            }
        };
        total += val * mult;
    }
    if !matched {
        return Err(ConfigError::invalid(
            "timeout",
            format!("could not parse '{timestr}' as a duration"),
        ));
    }
    Ok(total as u64)
}

#[cfg(test)]
#[path = "units_tests.rs"]
mod tests;
