// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run status and failure reasons.

use crate::id::{StepId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a run.
///
/// ```text
/// running ──► waiting_breakpoint ──approve──► running
///    │                 │
///    │                 └──reject──► failed
///    ├──► completed
///    ├──► failed
///    └──► cancelled   (also reachable from waiting_breakpoint)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Running,
    WaitingBreakpoint,
    Failed,
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Failed | RunStatus::Completed | RunStatus::Cancelled
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::WaitingBreakpoint => "waiting_breakpoint",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why a run ended in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// A step's mapping referenced a value that was absent at run time.
    InputMapping { step_id: StepId, message: String },
    InputValidation {
        step_id: StepId,
        task_id: TaskId,
        violations: Vec<String>,
    },
    OutputValidation {
        step_id: StepId,
        task_id: TaskId,
        violations: Vec<String>,
    },
    Agent {
        step_id: StepId,
        task_id: TaskId,
        message: String,
    },
    BreakpointRejected {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A breakpoint's summary or file paths could not be resolved.
    BreakpointContext { title: String, message: String },
    /// Persistence or bookkeeping failure while committing a step.
    Internal { message: String },
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::InputMapping { .. } => "input_mapping",
            FailureReason::InputValidation { .. } => "input_validation",
            FailureReason::OutputValidation { .. } => "output_validation",
            FailureReason::Agent { .. } => "agent_error",
            FailureReason::BreakpointRejected { .. } => "breakpoint_rejected",
            FailureReason::BreakpointContext { .. } => "breakpoint_context",
            FailureReason::Internal { .. } => "internal",
        }
    }

    /// Step the failure is attributed to, if any.
    pub fn step_id(&self) -> Option<&StepId> {
        match self {
            FailureReason::InputMapping { step_id, .. }
            | FailureReason::InputValidation { step_id, .. }
            | FailureReason::OutputValidation { step_id, .. }
            | FailureReason::Agent { step_id, .. } => Some(step_id),
            FailureReason::BreakpointRejected { .. }
            | FailureReason::BreakpointContext { .. }
            | FailureReason::Internal { .. } => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::InputMapping { step_id, message } => {
                write!(f, "step {step_id}: input mapping failed: {message}")
            }
            FailureReason::InputValidation {
                step_id,
                task_id,
                violations,
            } => write!(
                f,
                "step {step_id} ({task_id}): input does not match schema: {}",
                violations.join("; ")
            ),
            FailureReason::OutputValidation {
                step_id,
                task_id,
                violations,
            } => write!(
                f,
                "step {step_id} ({task_id}): output does not match schema: {}",
                violations.join("; ")
            ),
            FailureReason::Agent {
                step_id,
                task_id,
                message,
            } => write!(f, "step {step_id} ({task_id}): agent error: {message}"),
            FailureReason::BreakpointRejected { title, message } => match message {
                Some(m) => write!(f, "breakpoint '{title}' rejected: {m}"),
                None => write!(f, "breakpoint '{title}' rejected"),
            },
            FailureReason::BreakpointContext { title, message } => {
                write!(f, "breakpoint '{title}': cannot build context: {message}")
            }
            FailureReason::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
