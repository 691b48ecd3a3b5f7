// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run orchestration
//!
//! The orchestrator owns every loaded run. Each run sits behind its own
//! async lock, so steps and persistence writes of one run are serialized
//! while independent runs proceed concurrently.
//!
//! ```text
//! start ──► drive ──► step ──► step ──► … ──► completed | failed
//!                       │
//!                       └──► waiting_breakpoint ──resume──► drive
//! ```
//!
//! Runs not yet in memory are loaded lazily from the store, so `resume`,
//! `step` and the query methods work the same after a restart.

mod outcome;
mod step;

pub use outcome::{OutcomeMetadata, ProcessOutcome};

use crate::artifacts::ArtifactCollector;
use crate::error::OrchestratorError;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use wp_adapters::AgentExecutor;
use wp_core::{
    Artifact, BreakpointRequest, Clock, Decision, IdGen, ProcessId, RunEvent, RunId, RunStatus,
    SystemClock, UuidIdGen,
};
use wp_process::{ProcessDefinition, TaskRegistry};
use wp_storage::{RunLog, RunState, RunStore, StoreError};

/// Execution policy shared by all runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Attempts per step for recoverable executor errors
    pub agent_attempts: u32,
    /// Upper bound on a single executor call
    pub agent_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_attempts: 1,
            agent_timeout: None,
        }
    }
}

/// External collaborators of the orchestrator.
pub struct OrchestratorDeps<E, C = SystemClock, G = UuidIdGen> {
    pub executor: E,
    pub store: RunStore,
    pub registry: TaskRegistry,
    pub clock: C,
    pub ids: G,
}

/// One loaded run.
struct RunHandle {
    definition: Arc<ProcessDefinition>,
    log: tokio::sync::Mutex<RunLog>,
    /// Copy of the state after the last commit, readable without the lock
    latest: RwLock<RunState>,
    cancel: CancellationToken,
}

impl RunHandle {
    fn new(definition: Arc<ProcessDefinition>, log: RunLog) -> Self {
        let latest = RwLock::new(log.state().clone());
        Self {
            definition,
            log: tokio::sync::Mutex::new(log),
            latest,
            cancel: CancellationToken::new(),
        }
    }

    fn latest(&self) -> RunState {
        self.latest.read().clone()
    }

    fn commit(&self, log: &mut RunLog, event: &RunEvent) -> Result<(), OrchestratorError> {
        log.commit(event)?;
        *self.latest.write() = log.state().clone();
        Ok(())
    }
}

/// Drives process definitions against persisted run state.
#[derive(Clone)]
pub struct Orchestrator<E, C = SystemClock, G = UuidIdGen> {
    executor: E,
    store: RunStore,
    registry: Arc<TaskRegistry>,
    clock: C,
    ids: G,
    config: OrchestratorConfig,
    processes: Arc<RwLock<HashMap<ProcessId, Arc<ProcessDefinition>>>>,
    runs: Arc<Mutex<HashMap<RunId, Arc<RunHandle>>>>,
}

impl<E, C, G> Orchestrator<E, C, G>
where
    E: AgentExecutor,
    C: Clock,
    G: IdGen,
{
    pub fn new(deps: OrchestratorDeps<E, C, G>, config: OrchestratorConfig) -> Self {
        Self {
            executor: deps.executor,
            store: deps.store,
            registry: Arc::new(deps.registry),
            clock: deps.clock,
            ids: deps.ids,
            config,
            processes: Arc::new(RwLock::new(HashMap::new())),
            runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Validate `definition` against the registry and make it startable.
    ///
    /// Registering an identical definition again is a no-op.
    pub fn register_process(&self, definition: ProcessDefinition) -> Result<(), OrchestratorError> {
        definition
            .validate(&self.registry)
            .map_err(|errors| OrchestratorError::InvalidProcess {
                process: definition.id.clone(),
                errors,
            })?;

        let mut processes = self.processes.write();
        if let Some(existing) = processes.get(&definition.id) {
            if existing.content_hash() == definition.content_hash() {
                return Ok(());
            }
            return Err(OrchestratorError::DuplicateProcess(definition.id));
        }
        tracing::info!(
            process = %definition.id,
            steps = definition.len(),
            breakpoints = definition.breakpoints.len(),
            "registered process",
        );
        processes.insert(definition.id.clone(), Arc::new(definition));
        Ok(())
    }

    pub fn process(&self, process_id: &str) -> Result<Arc<ProcessDefinition>, OrchestratorError> {
        self.processes
            .read()
            .get(process_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::ProcessNotFound(ProcessId::new(process_id)))
    }

    /// Create a run and drive it until it pauses or finishes.
    pub async fn start(&self, process_id: &str, input: Value) -> Result<RunId, OrchestratorError> {
        let definition = self.process(process_id)?;
        let run_id = RunId::new(self.ids.next());
        let created = RunEvent::RunCreated {
            run_id: run_id.clone(),
            process_id: definition.id.clone(),
            definition_hash: definition.content_hash(),
            input,
            step_count: definition.len(),
            created_at_ms: self.clock.epoch_ms(),
        };
        let log = self.store.create(&created)?;
        let handle = Arc::new(RunHandle::new(definition, log));
        self.runs.lock().insert(run_id.clone(), Arc::clone(&handle));
        tracing::info!(run_id = %run_id, process = process_id, "run created");

        let state = self.drive(&handle).await?;
        self.release_if_terminal(&state);
        Ok(run_id)
    }

    /// Perform one transition of `run_id` and return the resulting state.
    ///
    /// A run that is not `running` is returned unchanged.
    pub async fn step(&self, run_id: &RunId) -> Result<RunState, OrchestratorError> {
        let handle = self.handle(run_id)?;
        let span = tracing::info_span!("run", run_id = %run_id);
        let state = self.step_once(&handle).instrument(span).await?;
        self.release_if_terminal(&state);
        Ok(state)
    }

    /// Answer the pending breakpoint of `run_id`.
    ///
    /// Approval continues the run until its next pause; rejection fails it.
    /// A run that is not waiting is returned unchanged, so a repeated resume
    /// never executes anything twice.
    pub async fn resume(
        &self,
        run_id: &RunId,
        decision: Decision,
    ) -> Result<RunState, OrchestratorError> {
        let handle = self.handle(run_id)?;
        {
            let mut log = handle.log.lock().await;
            let state = log.state();
            let position = match &state.pending_breakpoint {
                Some(pending) if state.status == RunStatus::WaitingBreakpoint => pending.position,
                _ => {
                    tracing::debug!(run_id = %run_id, status = %state.status, "resume ignored, run is not waiting");
                    return Ok(state.clone());
                }
            };
            let approved = decision.approved;
            handle.commit(
                &mut log,
                &RunEvent::BreakpointResolved {
                    run_id: run_id.clone(),
                    position,
                    decision,
                    at_ms: self.clock.epoch_ms(),
                },
            )?;
            tracing::info!(run_id = %run_id, position, approved, "breakpoint resolved");
            if !approved {
                let state = log.state().clone();
                self.release_if_terminal(&state);
                return Ok(state);
            }
        }
        let state = self.drive(&handle).await?;
        self.release_if_terminal(&state);
        Ok(state)
    }

    /// Stop `run_id`: interrupt any executor call and mark the run cancelled.
    pub async fn cancel(&self, run_id: &RunId) -> Result<RunState, OrchestratorError> {
        let handle = self.handle(run_id)?;
        handle.cancel.cancel();

        let mut log = handle.log.lock().await;
        if !log.state().is_terminal() {
            handle.commit(
                &mut log,
                &RunEvent::RunCancelled {
                    run_id: run_id.clone(),
                    at_ms: self.clock.epoch_ms(),
                },
            )?;
            tracing::info!(run_id = %run_id, "run cancelled");
        }
        let state = log.state().clone();
        self.release_if_terminal(&state);
        Ok(state)
    }

    /// Load `run_id` from disk (if needed) and continue it if it is running.
    pub async fn recover(&self, run_id: &RunId) -> Result<RunState, OrchestratorError> {
        let handle = self.handle(run_id)?;
        let state = self.drive(&handle).await?;
        self.release_if_terminal(&state);
        Ok(state)
    }

    /// Recover every persisted run.
    ///
    /// Runs whose process is no longer registered, or was changed since the
    /// run started, are logged and left untouched.
    pub async fn recover_all(&self) -> Result<Vec<RunState>, OrchestratorError> {
        let mut recovered = Vec::new();
        for run_id in self.store.list_runs()? {
            match self.recover(&run_id).await {
                Ok(state) => recovered.push(state),
                Err(
                    e @ (OrchestratorError::ProcessNotFound(_)
                    | OrchestratorError::DefinitionChanged { .. }),
                ) => {
                    tracing::warn!(run_id = %run_id, error = %e, "skipping run");
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!(runs = recovered.len(), "recovered runs");
        Ok(recovered)
    }

    pub fn state(&self, run_id: &RunId) -> Result<RunState, OrchestratorError> {
        Ok(self.handle(run_id)?.latest())
    }

    pub fn pending_breakpoint(
        &self,
        run_id: &RunId,
    ) -> Result<Option<BreakpointRequest>, OrchestratorError> {
        let state = self.state(run_id)?;
        Ok(state
            .pending_breakpoint
            .filter(|_| state.status == RunStatus::WaitingBreakpoint)
            .map(|pending| pending.request))
    }

    /// The input the next step would receive, without running it.
    ///
    /// `None` once the run is terminal or every step has completed.
    pub fn next_input(&self, run_id: &RunId) -> Result<Option<Value>, OrchestratorError> {
        let handle = self.handle(run_id)?;
        let state = handle.latest();
        if state.is_terminal() {
            return Ok(None);
        }
        let Some(step) = handle.definition.steps.get(state.current_step_index) else {
            return Ok(None);
        };
        Ok(Some(step::resolve_input(&state, step)?))
    }

    pub fn outcome(&self, run_id: &RunId) -> Result<ProcessOutcome, OrchestratorError> {
        Ok(ProcessOutcome::from_state(&self.state(run_id)?))
    }

    pub fn artifacts(&self, run_id: &RunId) -> Result<Vec<Artifact>, OrchestratorError> {
        Ok(ArtifactCollector::collect(&self.state(run_id)?))
    }

    /// Ids of runs currently loaded in memory, sorted.
    ///
    /// Only runs that can still change are kept loaded.
    pub fn loaded_runs(&self) -> Vec<RunId> {
        let mut ids: Vec<RunId> = self.runs.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn handle(&self, run_id: &RunId) -> Result<Arc<RunHandle>, OrchestratorError> {
        let mut runs = self.runs.lock();
        if let Some(handle) = runs.get(run_id) {
            return Ok(Arc::clone(handle));
        }

        let log = match self.store.open(run_id) {
            Ok(log) => log,
            Err(StoreError::NotFound(id)) => return Err(OrchestratorError::RunNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        let state = log.state();
        let definition = self.process(state.process_id.as_str())?;
        if definition.content_hash() != state.definition_hash {
            return Err(OrchestratorError::DefinitionChanged {
                run_id: run_id.clone(),
                process_id: state.process_id.clone(),
            });
        }

        tracing::info!(
            run_id = %run_id,
            status = %state.status,
            step = state.current_step_index,
            "loaded run from disk",
        );
        let terminal = state.is_terminal();
        let handle = Arc::new(RunHandle::new(definition, log));
        if !terminal {
            runs.insert(run_id.clone(), Arc::clone(&handle));
        }
        Ok(handle)
    }

    /// Drop the in-memory handle of a finished run, closing its journal.
    ///
    /// Later queries reload the run from disk.
    fn release_if_terminal(&self, state: &RunState) {
        if state.is_terminal() && self.runs.lock().remove(&state.run_id).is_some() {
            tracing::debug!(run_id = %state.run_id, status = %state.status, "released run");
        }
    }

    /// Step until the run leaves `running`.
    async fn drive(&self, handle: &RunHandle) -> Result<RunState, OrchestratorError> {
        let run_id = handle.latest().run_id;
        let span = tracing::info_span!("run", run_id = %run_id);
        async {
            loop {
                if handle.cancel.is_cancelled() {
                    return Ok(handle.latest());
                }
                let state = self.step_once(handle).await?;
                if state.status != RunStatus::Running {
                    tracing::info!(
                        status = %state.status,
                        steps_completed = state.completed_results.len(),
                        "run paused or finished",
                    );
                    return Ok(state);
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "../orchestrator_tests/mod.rs"]
mod tests;
