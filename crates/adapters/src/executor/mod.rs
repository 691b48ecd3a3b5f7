// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent executors
//!
//! An executor carries out one effect: it receives the rendered prompt (agent
//! tasks) or the input document (script tasks) and returns the task's output
//! JSON. Schema validation, persistence and retries belong to the caller.
//!
//! ```text
//! run_id     - one execution of a process
//!    │
//!    └── effect_id  - one attempt at one step; owns tasks/<effect_id>/
//! ```

mod command;

pub use command::CommandExecutor;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecutorCall, FakeAgentExecutor};

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use wp_core::{EffectId, RunId, StepId, TaskId};
use wp_process::ExecutionKind;

/// Errors from executing an effect
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("agent failed: {0}")]
    Failed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("agent unavailable: {0}")]
    Unavailable(String),
    #[error("cancelled")]
    Cancelled,
}

impl AgentError {
    /// Whether an optional step may be skipped, or the call retried.
    ///
    /// Cancellation is the caller's own request and is never recovered from.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AgentError::Cancelled)
    }

    /// Stable machine-readable kind, recorded in `result.json`.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Timeout(_) => "timeout",
            AgentError::Failed(_) => "failed",
            AgentError::InvalidResponse(_) => "invalid_response",
            AgentError::Unavailable(_) => "unavailable",
            AgentError::Cancelled => "cancelled",
        }
    }
}

/// Everything an executor needs for one effect.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub run_id: RunId,
    pub step_id: StepId,
    pub task_id: TaskId,
    pub effect_id: EffectId,
    pub kind: ExecutionKind,
    /// Rendered prompt (agent tasks only)
    pub prompt: Option<String>,
    /// Validated step input
    pub input: Value,
    pub output_schema: Value,
    /// Script command (script tasks only)
    pub command: Option<String>,
    /// `tasks/<effect_id>/`, already containing `input.json`
    pub task_dir: PathBuf,
    pub attempt: u32,
}

/// Adapter for invoking agents and scripts
#[async_trait]
pub trait AgentExecutor: Clone + Send + Sync + 'static {
    /// Run one effect to completion and return its output JSON.
    ///
    /// Implementations must return promptly with [`AgentError::Cancelled`]
    /// once `cancel` fires.
    async fn invoke(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> Result<Value, AgentError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
