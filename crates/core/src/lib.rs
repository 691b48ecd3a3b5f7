// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wp-core: shared types for the Waypoint process orchestrator

pub mod artifact;
pub mod breakpoint;
pub mod clock;
pub mod event;
pub mod id;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use artifact::{artifacts_from_output, format_for_path, Artifact, ArtifactKind};
pub use breakpoint::{BreakpointContext, BreakpointRequest, Decision, FileRef};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::RunEvent;
pub use id::{
    EffectId, IdGen, ProcessId, RunId, SequentialIdGen, StepId, TaskId, UuidIdGen,
};
pub use status::{FailureReason, RunStatus};
