// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake executor for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{AgentError, AgentExecutor, AgentRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wp_core::{EffectId, RunId, StepId, TaskId};

/// Recorded call to FakeAgentExecutor
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorCall {
    pub run_id: RunId,
    pub step_id: StepId,
    pub task_id: TaskId,
    pub effect_id: EffectId,
    pub input: Value,
    pub prompt: Option<String>,
    pub attempt: u32,
}

/// Fake executor for testing
///
/// Responses are scripted per task id. Queued responses are consumed in
/// order; once a task's queue is empty its default response (if any) is
/// returned on every call. Unscripted tasks echo their input.
#[derive(Clone, Default)]
pub struct FakeAgentExecutor {
    inner: Arc<Mutex<FakeExecutorState>>,
}

#[derive(Default)]
struct FakeExecutorState {
    queued: HashMap<TaskId, VecDeque<Result<Value, AgentError>>>,
    defaults: HashMap<TaskId, Result<Value, AgentError>>,
    delays: HashMap<TaskId, Duration>,
    calls: Vec<ExecutorCall>,
}

impl FakeAgentExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `output` for every call to `task`.
    pub fn respond(&self, task: impl Into<TaskId>, output: Value) -> &Self {
        self.inner.lock().defaults.insert(task.into(), Ok(output));
        self
    }

    /// Fail every call to `task` with `error`.
    pub fn fail(&self, task: impl Into<TaskId>, error: AgentError) -> &Self {
        self.inner.lock().defaults.insert(task.into(), Err(error));
        self
    }

    /// Queue a one-shot result for the next call to `task`.
    pub fn push(&self, task: impl Into<TaskId>, result: Result<Value, AgentError>) -> &Self {
        self.inner
            .lock()
            .queued
            .entry(task.into())
            .or_default()
            .push_back(result);
        self
    }

    /// Sleep before answering `task`. Cancellation interrupts the sleep.
    pub fn delay(&self, task: impl Into<TaskId>, delay: Duration) -> &Self {
        self.inner.lock().delays.insert(task.into(), delay);
        self
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of calls made for `task`
    pub fn call_count(&self, task: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.task_id == *task)
            .count()
    }
}

#[async_trait]
impl AgentExecutor for FakeAgentExecutor {
    async fn invoke(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> Result<Value, AgentError> {
        let delay = {
            let mut inner = self.inner.lock();
            inner.calls.push(ExecutorCall {
                run_id: request.run_id.clone(),
                step_id: request.step_id.clone(),
                task_id: request.task_id.clone(),
                effect_id: request.effect_id.clone(),
                input: request.input.clone(),
                prompt: request.prompt.clone(),
                attempt: request.attempt,
            });
            inner.delays.get(&request.task_id).copied()
        };

        if let Some(delay) = delay {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return Err(AgentError::Cancelled),
            }
        } else if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let mut inner = self.inner.lock();
        if let Some(result) = inner
            .queued
            .get_mut(&request.task_id)
            .and_then(VecDeque::pop_front)
        {
            return result;
        }
        match inner.defaults.get(&request.task_id) {
            Some(result) => result.clone(),
            None => Ok(request.input),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
