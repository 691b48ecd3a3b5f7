// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One transition of a run
//!
//! A step either gates the current position (breakpoint, completion) or
//! executes the current task:
//!
//! 1. resolve the input mapping and check it against `input_schema`
//! 2. write `tasks/<effect>/input.json`, journal `task:started`
//! 3. invoke the executor
//! 4. write `tasks/<effect>/result.json`
//! 5. check the output against `output_schema`, journal `task:completed`
//!
//! `result.json` is the completion marker. A run that was interrupted
//! between 4 and 5 commits the recorded result on its next step instead of
//! invoking the executor again.

use super::{Orchestrator, RunHandle};
use crate::error::OrchestratorError;
use serde_json::Value;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use wp_adapters::{AgentError, AgentExecutor, AgentRequest};
use wp_core::{
    artifacts_from_output, BreakpointContext, BreakpointRequest, Clock, EffectId, FailureReason,
    FileRef, IdGen, RunEvent, RunStatus,
};
use wp_process::{
    validate_schema, BreakpointDef, ExecutionKind, InputMapping, MappingError, ProcessStep, Scope,
    SchemaViolation, TaskSpec,
};
use wp_storage::{RunLog, RunState, TaskResult};

/// Outputs of completed steps by step id. Skipped steps map to `null`.
fn step_outputs(state: &RunState) -> HashMap<&str, &Value> {
    state
        .completed_results
        .iter()
        .map(|r| (r.step_id.as_str(), &r.output))
        .collect()
}

/// Build the input `step` would receive given the results so far.
pub(super) fn resolve_input(state: &RunState, step: &ProcessStep) -> Result<Value, MappingError> {
    let outputs = step_outputs(state);
    let scope = Scope {
        run_id: state.run_id.as_str(),
        process_id: state.process_id.as_str(),
        input: &state.input,
        steps: &outputs,
    };
    step.input.resolve(&scope)
}

/// Render the request shown to a reviewer at `bp`.
///
/// Files are the breakpoint's declared files followed by every output
/// artifact committed so far that is not already listed.
fn breakpoint_request(state: &RunState, bp: &BreakpointDef) -> Result<BreakpointRequest, MappingError> {
    let outputs = step_outputs(state);
    let scope = Scope {
        run_id: state.run_id.as_str(),
        process_id: state.process_id.as_str(),
        input: &state.input,
        steps: &outputs,
    };

    let summary = bp.context.resolve(&scope)?;
    let mut files = Vec::with_capacity(bp.files.len());
    for file in &bp.files {
        let path = match InputMapping::new(Value::String(file.path.clone())).resolve(&scope)? {
            Value::String(path) => path,
            other => other.to_string(),
        };
        files.push(FileRef {
            path,
            format: file.format.clone(),
        });
    }
    for artifact in state.artifacts.iter().filter(|a| !a.is_warning()) {
        if !files.iter().any(|f| f.path == artifact.path) {
            files.push(FileRef {
                path: artifact.path.clone(),
                format: artifact.format.clone(),
            });
        }
    }

    Ok(BreakpointRequest {
        question: bp.question.clone(),
        title: bp.title.clone(),
        context: BreakpointContext {
            run_id: state.run_id.clone(),
            files,
            summary,
        },
    })
}

fn violation_strings(violations: Vec<SchemaViolation>) -> Vec<String> {
    violations.into_iter().map(|v| v.to_string()).collect()
}

/// Executor errors that an optional step may be skipped for.
fn recoverable_kind(kind: &str) -> bool {
    kind != AgentError::Cancelled.kind()
}

impl<E, C, G> Orchestrator<E, C, G>
where
    E: AgentExecutor,
    C: Clock,
    G: IdGen,
{
    pub(super) async fn step_once(&self, handle: &RunHandle) -> Result<RunState, OrchestratorError> {
        let mut log = handle.log.lock().await;
        if log.state().status != RunStatus::Running {
            return Ok(log.state().clone());
        }
        if self.gate(handle, &mut log)? {
            return Ok(log.state().clone());
        }

        let index = log.state().current_step_index;
        let Some(step) = handle.definition.steps.get(index) else {
            return Ok(log.state().clone());
        };
        let span = tracing::info_span!("step", index, step = %step.id, task = %step.task_id);
        self.run_step(handle, &mut log, index, step)
            .instrument(span)
            .await?;

        if log.state().status == RunStatus::Running {
            self.gate(handle, &mut log)?;
        }
        Ok(log.state().clone())
    }

    /// Pause at an unapproved breakpoint, or complete a run with no steps
    /// left. Returns whether the run left `running`.
    fn gate(&self, handle: &RunHandle, log: &mut RunLog) -> Result<bool, OrchestratorError> {
        let state = log.state();
        let index = state.current_step_index;
        let run_id = state.run_id.clone();

        if let Some(bp) = handle.definition.breakpoint_at(index) {
            if !state.is_breakpoint_approved(index) {
                let event = match breakpoint_request(state, bp) {
                    Ok(request) => {
                        tracing::info!(position = index, title = %bp.title, "waiting at breakpoint");
                        RunEvent::BreakpointReached {
                            run_id,
                            position: index,
                            request,
                            at_ms: self.clock.epoch_ms(),
                        }
                    }
                    Err(e) => {
                        tracing::error!(title = %bp.title, error = %e, "breakpoint context failed");
                        RunEvent::RunFailed {
                            run_id,
                            reason: FailureReason::BreakpointContext {
                                title: bp.title.clone(),
                                message: e.to_string(),
                            },
                            at_ms: self.clock.epoch_ms(),
                        }
                    }
                };
                handle.commit(log, &event)?;
                return Ok(true);
            }
        }

        if index >= handle.definition.len() {
            handle.commit(
                log,
                &RunEvent::RunCompleted {
                    run_id,
                    at_ms: self.clock.epoch_ms(),
                },
            )?;
            tracing::info!(steps = index, "run completed");
            return Ok(true);
        }
        Ok(false)
    }

    async fn run_step(
        &self,
        handle: &RunHandle,
        log: &mut RunLog,
        index: usize,
        step: &ProcessStep,
    ) -> Result<(), OrchestratorError> {
        let run_id = log.state().run_id.clone();
        let spec = match self.registry.resolve(step.task_id.as_str()) {
            Ok(spec) => spec,
            Err(e) => return self.fail(handle, log, FailureReason::Internal { message: e.to_string() }),
        };

        let mut first_attempt = 1;
        if let Some(in_flight) = log.state().in_flight.clone().filter(|f| f.step_index == index) {
            match self.store.read_result(&run_id, &in_flight.effect_id)? {
                Some(TaskResult::Error { kind, message })
                    if recoverable_kind(&kind) && in_flight.attempt < self.config.agent_attempts =>
                {
                    tracing::info!(effect = %in_flight.effect_id, kind = %kind, message = %message, "retrying attempt interrupted by restart");
                    first_attempt = in_flight.attempt + 1;
                }
                Some(result) => {
                    tracing::info!(effect = %in_flight.effect_id, "committing result recorded before restart");
                    return self.apply_result(handle, log, index, step, spec, in_flight.effect_id, result);
                }
                None => {
                    tracing::warn!(effect = %in_flight.effect_id, attempt = in_flight.attempt, "interrupted attempt left no result, re-executing");
                    first_attempt = in_flight.attempt;
                }
            }
        }

        let input = match resolve_input(log.state(), step) {
            Ok(input) => input,
            Err(e) => {
                let reason = FailureReason::InputMapping {
                    step_id: step.id.clone(),
                    message: e.to_string(),
                };
                return self.fail(handle, log, reason);
            }
        };
        if let Err(violations) = validate_schema(&spec.input_schema, &input) {
            let reason = FailureReason::InputValidation {
                step_id: step.id.clone(),
                task_id: step.task_id.clone(),
                violations: violation_strings(violations),
            };
            return self.fail(handle, log, reason);
        }

        let prompt = match spec.execution_kind {
            ExecutionKind::Agent => Some(spec.prompt.render(&input, &spec.output_schema)),
            ExecutionKind::Script => None,
        };

        let attempts = self.config.agent_attempts.max(first_attempt);
        for attempt in first_attempt..=attempts {
            let effect_id = EffectId::new(self.ids.next());
            self.store.write_input(&run_id, &effect_id, &input)?;
            handle.commit(
                log,
                &RunEvent::TaskStarted {
                    run_id: run_id.clone(),
                    step_index: index,
                    step_id: step.id.clone(),
                    task_id: step.task_id.clone(),
                    effect_id: effect_id.clone(),
                    attempt,
                    started_at_ms: self.clock.epoch_ms(),
                },
            )?;

            let request = AgentRequest {
                run_id: run_id.clone(),
                step_id: step.id.clone(),
                task_id: step.task_id.clone(),
                effect_id: effect_id.clone(),
                kind: spec.execution_kind,
                prompt: prompt.clone(),
                input: input.clone(),
                output_schema: spec.output_schema.clone(),
                command: spec.command.clone(),
                task_dir: self.store.task_dir(&run_id, &effect_id),
                attempt,
            };

            let result = match self.invoke(request, handle.cancel.clone()).await {
                Ok(output) => TaskResult::Ok { output },
                Err(AgentError::Cancelled) if handle.cancel.is_cancelled() => {
                    tracing::info!(effect = %effect_id, "executor call cancelled");
                    return Ok(());
                }
                Err(e) => {
                    let retry = e.is_recoverable() && attempt < attempts;
                    let result = TaskResult::Error {
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    };
                    if retry {
                        self.store.write_result(&run_id, &effect_id, &result)?;
                        tracing::warn!(effect = %effect_id, attempt, error = %e, "attempt failed, retrying");
                        continue;
                    }
                    result
                }
            };

            self.store.write_result(&run_id, &effect_id, &result)?;
            return self.apply_result(handle, log, index, step, spec, effect_id, result);
        }
        Ok(())
    }

    async fn invoke(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> Result<Value, AgentError> {
        let call = self.executor.invoke(request, cancel);
        match self.config.agent_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(AgentError::Timeout(limit))),
            None => call.await,
        }
    }

    /// Commit the recorded outcome of an effect.
    #[allow(clippy::too_many_arguments)]
    fn apply_result(
        &self,
        handle: &RunHandle,
        log: &mut RunLog,
        index: usize,
        step: &ProcessStep,
        spec: &TaskSpec,
        effect_id: EffectId,
        result: TaskResult,
    ) -> Result<(), OrchestratorError> {
        let run_id = log.state().run_id.clone();
        match result {
            TaskResult::Ok { output } => {
                if let Err(violations) = validate_schema(&spec.output_schema, &output) {
                    let reason = FailureReason::OutputValidation {
                        step_id: step.id.clone(),
                        task_id: step.task_id.clone(),
                        violations: violation_strings(violations),
                    };
                    return self.fail(handle, log, reason);
                }
                let artifacts = artifacts_from_output(&output);
                tracing::info!(effect = %effect_id, artifacts = artifacts.len(), "step completed");
                handle.commit(
                    log,
                    &RunEvent::TaskCompleted {
                        run_id,
                        step_index: index,
                        step_id: step.id.clone(),
                        task_id: step.task_id.clone(),
                        effect_id,
                        output,
                        artifacts,
                        finished_at_ms: self.clock.epoch_ms(),
                    },
                )
            }
            TaskResult::Error { kind, message } if step.optional && recoverable_kind(&kind) => {
                tracing::warn!(effect = %effect_id, kind = %kind, message = %message, "optional step skipped");
                handle.commit(
                    log,
                    &RunEvent::TaskSkipped {
                        run_id,
                        step_index: index,
                        step_id: step.id.clone(),
                        task_id: step.task_id.clone(),
                        effect_id,
                        warning: message,
                        finished_at_ms: self.clock.epoch_ms(),
                    },
                )
            }
            TaskResult::Error { message, .. } => {
                let reason = FailureReason::Agent {
                    step_id: step.id.clone(),
                    task_id: step.task_id.clone(),
                    message,
                };
                self.fail(handle, log, reason)
            }
        }
    }

    fn fail(
        &self,
        handle: &RunHandle,
        log: &mut RunLog,
        reason: FailureReason,
    ) -> Result<(), OrchestratorError> {
        tracing::error!(code = reason.code(), reason = %reason, "run failed");
        let event = RunEvent::RunFailed {
            run_id: log.state().run_id.clone(),
            reason,
            at_ms: self.clock.epoch_ms(),
        };
        handle.commit(log, &event)
    }
}
