// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Rigfile loading.
//!
//! A rigfile is a small YAML document: rig-level options at the top level,
//! plus `monitors` and `actions` mappings keyed by registry name. The
//! loader validates structure and the rig-level options; per-monitor and
//! per-action option maps are passed through as raw YAML for the registry
//! to validate against its typed schemas.

mod loader;

pub use loader::{load, load_str, Rigfile, RigfileError};
