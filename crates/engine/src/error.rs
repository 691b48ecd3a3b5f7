// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the orchestrator
//!
//! These are failures of the orchestrator itself. A run that fails while
//! executing (bad input, bad output, agent error, rejected breakpoint) is not
//! an error here: it is recorded on the run as a `FailureReason` and
//! surfaced through `ProcessOutcome`.

use thiserror::Error;
use wp_core::{ProcessId, RunId};
use wp_process::{MappingError, RegistryError, ValidationError};
use wp_storage::StoreError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("process '{process}' is invalid:{}", list(.errors))]
    InvalidProcess {
        process: ProcessId,
        errors: Vec<ValidationError>,
    },
    #[error("a different process '{0}' is already registered")]
    DuplicateProcess(ProcessId),
    #[error("process not found: {0}")]
    ProcessNotFound(ProcessId),
    #[error("run not found: {0}")]
    RunNotFound(RunId),
    #[error("run {run_id} was started from a different version of process '{process_id}'")]
    DefinitionChanged { run_id: RunId, process_id: ProcessId },
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn list(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| format!("\n  - {e}")).collect()
}
