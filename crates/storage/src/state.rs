// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run state materialized from journal replay

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wp_core::{
    Artifact, BreakpointRequest, EffectId, FailureReason, ProcessId, RunEvent, RunId, RunStatus,
    StepId, TaskId,
};

/// Committed outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: StepId,
    pub task_id: TaskId,
    pub effect_id: EffectId,
    /// `null` when the step was skipped
    pub output: Value,
    /// Warning recorded when an optional step was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub finished_at_ms: u64,
}

impl StepResult {
    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

/// The effect currently being executed, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlight {
    pub step_index: usize,
    pub step_id: StepId,
    pub task_id: TaskId,
    pub effect_id: EffectId,
    pub attempt: u32,
    pub started_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBreakpoint {
    pub position: usize,
    pub request: BreakpointRequest,
}

/// Durable state of one run.
///
/// Only [`RunState::apply_event`] mutates it, and applying the same event
/// twice is a no-op, so replaying a journal over a snapshot that already
/// contains some of its events is safe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: RunId,
    pub process_id: ProcessId,
    pub definition_hash: String,
    pub input: Value,
    pub step_count: usize,
    pub current_step_index: usize,
    #[serde(default)]
    pub completed_results: Vec<StepResult>,
    pub status: RunStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_breakpoint: Option<PendingBreakpoint>,
    /// Positions whose breakpoint has been approved
    #[serde(default)]
    pub approved_breakpoints: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_flight: Option<InFlight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Path of an effect's result file, relative to the run directory.
pub fn result_path(effect_id: &EffectId) -> String {
    format!("tasks/{effect_id}/result.json")
}

impl RunState {
    /// Build a state from a journal, starting empty.
    pub fn replay<'a>(events: impl IntoIterator<Item = &'a RunEvent>) -> Self {
        let mut state = Self::default();
        for event in events {
            state.apply_event(event);
        }
        state
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_breakpoint_approved(&self, position: usize) -> bool {
        self.approved_breakpoints.contains(&position)
    }

    /// Output of a completed step by id. Skipped steps yield `null`.
    pub fn step_output(&self, step_id: &str) -> Option<&Value> {
        self.completed_results
            .iter()
            .find(|r| r.step_id == step_id)
            .map(|r| &r.output)
    }

    pub fn apply_event(&mut self, event: &RunEvent) {
        let created = !self.run_id.as_str().is_empty();
        if !created && !matches!(event, RunEvent::RunCreated { .. }) {
            return;
        }
        if created && event.run_id() != &self.run_id {
            tracing::warn!(
                run_id = %self.run_id,
                event_run_id = %event.run_id(),
                event = event.name(),
                "ignoring event for another run",
            );
            return;
        }

        match event {
            RunEvent::RunCreated {
                run_id,
                process_id,
                definition_hash,
                input,
                step_count,
                created_at_ms,
            } => {
                // Already created, a replayed duplicate
                if !self.run_id.as_str().is_empty() {
                    return;
                }
                *self = RunState {
                    run_id: run_id.clone(),
                    process_id: process_id.clone(),
                    definition_hash: definition_hash.clone(),
                    input: input.clone(),
                    step_count: *step_count,
                    created_at_ms: *created_at_ms,
                    updated_at_ms: *created_at_ms,
                    ..RunState::default()
                };
            }

            RunEvent::TaskStarted {
                step_index,
                step_id,
                task_id,
                effect_id,
                attempt,
                started_at_ms,
                ..
            } => {
                if self.status != RunStatus::Running || *step_index != self.current_step_index {
                    return;
                }
                self.in_flight = Some(InFlight {
                    step_index: *step_index,
                    step_id: step_id.clone(),
                    task_id: task_id.clone(),
                    effect_id: effect_id.clone(),
                    attempt: *attempt,
                    started_at_ms: *started_at_ms,
                });
                self.updated_at_ms = *started_at_ms;
            }

            RunEvent::TaskCompleted {
                step_index,
                step_id,
                task_id,
                effect_id,
                output,
                artifacts,
                finished_at_ms,
                ..
            } => {
                // Committing the same index twice must not grow the results
                if self.is_terminal() || *step_index != self.current_step_index {
                    return;
                }
                self.completed_results.push(StepResult {
                    step_id: step_id.clone(),
                    task_id: task_id.clone(),
                    effect_id: effect_id.clone(),
                    output: output.clone(),
                    skipped: None,
                    finished_at_ms: *finished_at_ms,
                });
                self.artifacts.extend(artifacts.iter().cloned());
                self.current_step_index += 1;
                self.in_flight = None;
                self.updated_at_ms = *finished_at_ms;
            }

            RunEvent::TaskSkipped {
                step_index,
                step_id,
                task_id,
                effect_id,
                warning,
                finished_at_ms,
                ..
            } => {
                if self.is_terminal() || *step_index != self.current_step_index {
                    return;
                }
                self.completed_results.push(StepResult {
                    step_id: step_id.clone(),
                    task_id: task_id.clone(),
                    effect_id: effect_id.clone(),
                    output: Value::Null,
                    skipped: Some(warning.clone()),
                    finished_at_ms: *finished_at_ms,
                });
                let message = format!("step {step_id} skipped: {warning}");
                self.artifacts
                    .push(Artifact::warning(result_path(effect_id), message.clone()));
                self.warnings.push(message);
                self.current_step_index += 1;
                self.in_flight = None;
                self.updated_at_ms = *finished_at_ms;
            }

            RunEvent::BreakpointReached {
                position,
                request,
                at_ms,
                ..
            } => {
                if self.status != RunStatus::Running
                    || *position != self.current_step_index
                    || self.is_breakpoint_approved(*position)
                {
                    return;
                }
                self.status = RunStatus::WaitingBreakpoint;
                self.pending_breakpoint = Some(PendingBreakpoint {
                    position: *position,
                    request: request.clone(),
                });
                self.updated_at_ms = *at_ms;
            }

            RunEvent::BreakpointResolved {
                position,
                decision,
                at_ms,
                ..
            } => {
                let Some(pending) = &self.pending_breakpoint else {
                    return;
                };
                if self.status != RunStatus::WaitingBreakpoint || pending.position != *position {
                    return;
                }
                let title = pending.request.title.clone();
                self.pending_breakpoint = None;
                if decision.approved {
                    self.approved_breakpoints.push(*position);
                    self.status = RunStatus::Running;
                } else {
                    self.status = RunStatus::Failed;
                    self.failure = Some(FailureReason::BreakpointRejected {
                        title,
                        message: decision.message.clone(),
                    });
                }
                self.updated_at_ms = *at_ms;
            }

            RunEvent::RunFailed { reason, at_ms, .. } => {
                if self.is_terminal() {
                    return;
                }
                self.status = RunStatus::Failed;
                self.failure = Some(reason.clone());
                self.in_flight = None;
                self.updated_at_ms = *at_ms;
            }

            RunEvent::RunCompleted { at_ms, .. } => {
                if self.is_terminal() {
                    return;
                }
                self.status = RunStatus::Completed;
                self.updated_at_ms = *at_ms;
            }

            RunEvent::RunCancelled { at_ms, .. } => {
                if self.is_terminal() {
                    return;
                }
                self.status = RunStatus::Cancelled;
                self.in_flight = None;
                self.pending_breakpoint = None;
                self.updated_at_ms = *at_ms;
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
