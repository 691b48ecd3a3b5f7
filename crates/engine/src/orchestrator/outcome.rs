// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured result of a run at the process boundary

use crate::artifacts::ArtifactCollector;
use serde::{Deserialize, Serialize};
use wp_core::{Artifact, BreakpointRequest, ProcessId, RunId, RunStatus};
use wp_storage::RunState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeMetadata {
    pub run_id: RunId,
    pub process_id: ProcessId,
    pub status: RunStatus,
    pub steps_completed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// `{ success, error?, details?, metadata, artifacts }`
///
/// Failures are values, not errors: a failed run yields `success: false`
/// with the failure code in `error` and its description in `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub metadata: OutcomeMetadata,
    pub artifacts: Vec<Artifact>,
    /// Set while the run waits for a decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoint: Option<BreakpointRequest>,
}

impl ProcessOutcome {
    pub fn from_state(state: &RunState) -> Self {
        let (error, details) = match (&state.status, &state.failure) {
            (RunStatus::Failed, Some(reason)) => {
                (Some(reason.code().to_string()), Some(reason.to_string()))
            }
            (RunStatus::Failed, None) => (Some("failed".to_string()), None),
            (RunStatus::Cancelled, _) => (
                Some("cancelled".to_string()),
                Some(format!("run cancelled at step {}", state.current_step_index)),
            ),
            _ => (None, None),
        };

        Self {
            success: state.status == RunStatus::Completed,
            error,
            details,
            metadata: OutcomeMetadata {
                run_id: state.run_id.clone(),
                process_id: state.process_id.clone(),
                status: state.status,
                steps_completed: state.completed_results.len(),
                warnings: state.warnings.clone(),
            },
            artifacts: ArtifactCollector::collect(state),
            breakpoint: state
                .pending_breakpoint
                .as_ref()
                .filter(|_| state.status == RunStatus::WaitingBreakpoint)
                .map(|pending| pending.request.clone()),
        }
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
