// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Waypoint execution engine

pub mod artifacts;
pub mod env;
mod error;
pub mod logging;
mod orchestrator;

pub use artifacts::{ArtifactCollector, ArtifactManifest};
pub use env::{ConfigError, EngineConfig};
pub use error::OrchestratorError;
pub use logging::LoggingError;
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, OrchestratorDeps, OutcomeMetadata, ProcessOutcome,
};

use wp_adapters::{CommandExecutor, TracedExecutor};
use wp_process::TaskRegistry;

/// Orchestrator running tasks as shell commands, configured from `config`.
pub fn command_orchestrator(
    config: &EngineConfig,
    registry: TaskRegistry,
) -> Orchestrator<TracedExecutor<CommandExecutor>> {
    Orchestrator::new(
        OrchestratorDeps {
            executor: config.command_executor(),
            store: config.store(),
            registry,
            clock: wp_core::SystemClock,
            ids: wp_core::UuidIdGen,
        },
        config.orchestrator_config(),
    )
}
