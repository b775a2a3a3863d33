// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The rig lifecycle engine.
//!
//! A deployed rig is exactly one process built from this crate: a set of
//! concurrent condition monitors raced against a control socket, and a
//! serial pipeline of collection actions that runs when a monitor fires.

pub mod action;
pub mod archive;
pub mod daemonize;
pub mod env;
pub mod listener;
pub mod logging;
pub mod monitor;
pub mod options;
pub mod registry;
pub mod rig;

pub use rig::{Paths, RaceOutcome, Rig};
