// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end behavior of Waypoint runs.
//!
//! These tests drive the public engine API end to end: process files are
//! parsed and registered, runs are started against a scripted executor and
//! a temporary state directory, and the persisted run is inspected.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// run/
#[path = "specs/run/breakpoints.rs"]
mod run_breakpoints;
#[path = "specs/run/commands.rs"]
mod run_commands;
#[path = "specs/run/failures.rs"]
mod run_failures;
#[path = "specs/run/lifecycle.rs"]
mod run_lifecycle;
#[path = "specs/run/recovery.rs"]
mod run_recovery;
