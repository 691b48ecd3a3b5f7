// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell-command executor

use super::{AgentError, AgentExecutor, AgentRequest};
use crate::json::{decode_output, extract_first_json};
use crate::subprocess::{run_piped, SubprocessError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use wp_process::ExecutionKind;

/// Longest stderr excerpt carried in an error message.
const STDERR_EXCERPT: usize = 2000;

/// Runs each effect as `sh -c <command>` inside its task directory.
///
/// Agent tasks use the configured agent command and receive the rendered
/// prompt on stdin. Script tasks run their own command and receive the input
/// document. Either way the first JSON value on stdout is the output.
///
/// The child sees `WAYPOINT_RUN_ID`, `WAYPOINT_STEP_ID`, `WAYPOINT_EFFECT_ID`,
/// `WAYPOINT_TASK_DIR` and `WAYPOINT_ATTEMPT`.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    agent_command: Option<String>,
    timeout: Option<Duration>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent_command(mut self, command: impl Into<String>) -> Self {
        self.agent_command = Some(command.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn command_and_stdin(&self, request: &AgentRequest) -> Result<(String, Vec<u8>), AgentError> {
        match request.kind {
            ExecutionKind::Agent => {
                let command = self.agent_command.clone().ok_or_else(|| {
                    AgentError::Unavailable("no agent command configured".to_string())
                })?;
                let prompt = request.prompt.clone().unwrap_or_default();
                Ok((command, prompt.into_bytes()))
            }
            ExecutionKind::Script => {
                let command = request.command.clone().ok_or_else(|| {
                    AgentError::Failed(format!("task '{}' has no command", request.task_id))
                })?;
                let stdin = serde_json::to_vec(&request.input)
                    .map_err(|e| AgentError::Failed(format!("encoding input: {e}")))?;
                Ok((command, stdin))
            }
        }
    }
}

#[async_trait]
impl AgentExecutor for CommandExecutor {
    async fn invoke(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> Result<Value, AgentError> {
        let (command, stdin) = self.command_and_stdin(&request)?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&command)
            .current_dir(&request.task_dir)
            .env("WAYPOINT_RUN_ID", request.run_id.as_str())
            .env("WAYPOINT_STEP_ID", request.step_id.as_str())
            .env("WAYPOINT_EFFECT_ID", request.effect_id.as_str())
            .env("WAYPOINT_TASK_DIR", &request.task_dir)
            .env("WAYPOINT_ATTEMPT", request.attempt.to_string());

        let description = format!("{} task '{}'", request.kind, request.task_id);
        let output = run_piped(cmd, stdin, self.timeout, &cancel, &description)
            .await
            .map_err(|e| match e {
                SubprocessError::Timeout { timeout, .. } => AgentError::Timeout(timeout),
                SubprocessError::Cancelled { .. } => AgentError::Cancelled,
                SubprocessError::Spawn { .. } => AgentError::Unavailable(e.to_string()),
                SubprocessError::Io { .. } => AgentError::Failed(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = decode_output(&output.stderr);
            let stderr = stderr.trim();
            let excerpt: String = stderr.chars().take(STDERR_EXCERPT).collect();
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(AgentError::Failed(if excerpt.is_empty() {
                format!("exit {code}")
            } else {
                format!("exit {code}: {excerpt}")
            }));
        }

        let stdout = decode_output(&output.stdout);
        extract_first_json(&stdout).ok_or_else(|| {
            AgentError::InvalidResponse(format!(
                "no JSON object or array in {} bytes of output",
                output.stdout.len()
            ))
        })
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
