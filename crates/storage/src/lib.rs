// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for Waypoint runs

pub mod checkpoint;
mod journal;
pub mod migration;
mod snapshot;
mod state;
mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use checkpoint::{CheckpointError, CheckpointWriter, FsCheckpointWriter};
pub use journal::{Journal, JournalEntry, JournalError};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::{result_path, InFlight, PendingBreakpoint, RunState, StepResult};
pub use store::{RunLog, RunStore, StoreError, TaskResult};
