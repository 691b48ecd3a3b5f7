// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine.
//!
//! | Variable                    | Meaning                                   |
//! |-----------------------------|-------------------------------------------|
//! | `WAYPOINT_STATE_DIR`        | Root of persisted runs                    |
//! | `WAYPOINT_AGENT_TIMEOUT_MS` | Per-call executor timeout (unset or 0: none) |
//! | `WAYPOINT_AGENT_ATTEMPTS`   | Attempts per step for recoverable errors  |
//! | `WAYPOINT_AGENT_COMMAND`    | Shell command that runs agent tasks       |
//! | `WAYPOINT_LOG_FILE`         | Log to this file instead of stderr        |

use crate::orchestrator::OrchestratorConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use wp_adapters::{CommandExecutor, TracedExecutor};
use wp_storage::RunStore;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine state directory: set WAYPOINT_STATE_DIR")]
    NoStateDir,
    #[error("invalid {name}={value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Resolve state directory: WAYPOINT_STATE_DIR > XDG_STATE_HOME/waypoint > ~/.local/state/waypoint
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = var("WAYPOINT_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("waypoint"));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoStateDir)?;
    Ok(home.join(".local/state/waypoint"))
}

/// Executor timeout override. Zero disables the timeout.
pub fn agent_timeout() -> Result<Option<Duration>, ConfigError> {
    let ms = parse::<u64>("WAYPOINT_AGENT_TIMEOUT_MS")?;
    Ok(ms.filter(|ms| *ms > 0).map(Duration::from_millis))
}

pub fn agent_attempts() -> Result<Option<u32>, ConfigError> {
    match parse::<u32>("WAYPOINT_AGENT_ATTEMPTS")? {
        Some(0) => Err(ConfigError::Invalid {
            name: "WAYPOINT_AGENT_ATTEMPTS",
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        }),
        other => Ok(other),
    }
}

pub fn agent_command() -> Option<String> {
    var("WAYPOINT_AGENT_COMMAND")
}

pub fn log_file() -> Option<PathBuf> {
    var("WAYPOINT_LOG_FILE").map(PathBuf::from)
}

/// Non-empty value of `name`
fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = var(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: value.clone(),
            reason: e.to_string(),
        })
}

/// Everything needed to stand up an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub state_dir: PathBuf,
    pub agent_timeout: Option<Duration>,
    pub agent_attempts: u32,
    pub agent_command: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            agent_timeout: None,
            agent_attempts: 1,
            agent_command: None,
            log_file: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(state_dir()?);
        config.agent_timeout = agent_timeout()?;
        if let Some(attempts) = agent_attempts()? {
            config.agent_attempts = attempts;
        }
        config.agent_command = agent_command();
        config.log_file = log_file();
        Ok(config)
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = Some(timeout);
        self
    }

    /// Clamped to at least one attempt.
    pub fn with_agent_attempts(mut self, attempts: u32) -> Self {
        self.agent_attempts = attempts.max(1);
        self
    }

    pub fn with_agent_command(mut self, command: impl Into<String>) -> Self {
        self.agent_command = Some(command.into());
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            agent_attempts: self.agent_attempts,
            agent_timeout: self.agent_timeout,
        }
    }

    pub fn store(&self) -> RunStore {
        RunStore::new(&self.state_dir)
    }

    /// Shell-command executor wrapped in tracing.
    ///
    /// The orchestrator enforces the timeout, so the executor itself is
    /// built without one.
    pub fn command_executor(&self) -> TracedExecutor<CommandExecutor> {
        let mut executor = CommandExecutor::new();
        if let Some(command) = &self.agent_command {
            executor = executor.with_agent_command(command.clone());
        }
        TracedExecutor::new(executor)
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
