// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal events for a run.
//!
//! Every state change of a run is an event. Events are appended to the run's
//! journal before they are applied, so a run's state can always be rebuilt
//! from its last snapshot plus the journal tail.

use crate::artifact::Artifact;
use crate::breakpoint::{BreakpointRequest, Decision};
use crate::id::{EffectId, ProcessId, RunId, StepId, TaskId};
use crate::status::FailureReason;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serializes as `{"type": "scope:name", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    // -- run --
    #[serde(rename = "run:created")]
    RunCreated {
        run_id: RunId,
        process_id: ProcessId,
        definition_hash: String,
        input: Value,
        step_count: usize,
        created_at_ms: u64,
    },

    #[serde(rename = "run:failed")]
    RunFailed {
        run_id: RunId,
        reason: FailureReason,
        at_ms: u64,
    },

    #[serde(rename = "run:completed")]
    RunCompleted { run_id: RunId, at_ms: u64 },

    #[serde(rename = "run:cancelled")]
    RunCancelled { run_id: RunId, at_ms: u64 },

    // -- task --
    #[serde(rename = "task:started")]
    TaskStarted {
        run_id: RunId,
        step_index: usize,
        step_id: StepId,
        task_id: TaskId,
        effect_id: EffectId,
        #[serde(default = "first_attempt")]
        attempt: u32,
        started_at_ms: u64,
    },

    #[serde(rename = "task:completed")]
    TaskCompleted {
        run_id: RunId,
        step_index: usize,
        step_id: StepId,
        task_id: TaskId,
        effect_id: EffectId,
        output: Value,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        artifacts: Vec<Artifact>,
        finished_at_ms: u64,
    },

    /// An optional step failed recoverably and was passed over.
    #[serde(rename = "task:skipped")]
    TaskSkipped {
        run_id: RunId,
        step_index: usize,
        step_id: StepId,
        task_id: TaskId,
        effect_id: EffectId,
        warning: String,
        finished_at_ms: u64,
    },

    // -- breakpoint --
    #[serde(rename = "breakpoint:reached")]
    BreakpointReached {
        run_id: RunId,
        position: usize,
        request: BreakpointRequest,
        at_ms: u64,
    },

    #[serde(rename = "breakpoint:resolved")]
    BreakpointResolved {
        run_id: RunId,
        position: usize,
        decision: Decision,
        at_ms: u64,
    },
}

fn first_attempt() -> u32 {
    1
}

impl RunEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            RunEvent::RunCreated { run_id, .. }
            | RunEvent::RunFailed { run_id, .. }
            | RunEvent::RunCompleted { run_id, .. }
            | RunEvent::RunCancelled { run_id, .. }
            | RunEvent::TaskStarted { run_id, .. }
            | RunEvent::TaskCompleted { run_id, .. }
            | RunEvent::TaskSkipped { run_id, .. }
            | RunEvent::BreakpointReached { run_id, .. }
            | RunEvent::BreakpointResolved { run_id, .. } => run_id,
        }
    }

    /// The serialized type tag, for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::RunCreated { .. } => "run:created",
            RunEvent::RunFailed { .. } => "run:failed",
            RunEvent::RunCompleted { .. } => "run:completed",
            RunEvent::RunCancelled { .. } => "run:cancelled",
            RunEvent::TaskStarted { .. } => "task:started",
            RunEvent::TaskCompleted { .. } => "task:completed",
            RunEvent::TaskSkipped { .. } => "task:skipped",
            RunEvent::BreakpointReached { .. } => "breakpoint:reached",
            RunEvent::BreakpointResolved { .. } => "breakpoint:resolved",
        }
    }

    /// True for events that move a run into a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunEvent::RunFailed { .. } | RunEvent::RunCompleted { .. } | RunEvent::RunCancelled { .. }
        )
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
