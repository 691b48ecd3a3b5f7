// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator tests against the fake executor and a temp state dir

mod breakpoints;
mod cancel;
mod failures;
mod lifecycle;
mod recovery;

use super::*;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use wp_adapters::{AgentError, FakeAgentExecutor};
use wp_core::{FailureReason, FakeClock, SequentialIdGen};
use wp_process::{BreakpointDef, ProcessStep, PromptSpec, TaskSpec};

type TestOrchestrator = Orchestrator<FakeAgentExecutor, FakeClock, SequentialIdGen>;

/// `summarize` must return `{ "summary": string }`; `lint` returns anything;
/// `echo` is a script task.
fn registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry
        .register(
            TaskSpec::agent(
                "summarize",
                PromptSpec::new("Summarize the material").with_role("technical writer"),
            )
            .with_input_schema(json!({ "type": "object" }))
            .with_output_schema(json!({
                "type": "object",
                "required": ["summary"],
                "properties": { "summary": { "type": "string" } }
            })),
        )
        .unwrap();
    registry
        .register(TaskSpec::agent("lint", PromptSpec::new("Lint the draft")))
        .unwrap();
    registry
        .register(TaskSpec::script("echo", "cat"))
        .unwrap();
    registry
}

/// `n` summarize steps `s0..`, each fed the previous step's summary.
fn chain(id: &str, n: usize) -> ProcessDefinition {
    let mut builder = ProcessDefinition::builder(id);
    for i in 0..n {
        let step = ProcessStep::new(format!("s{i}"), "summarize");
        let step = if i == 0 {
            step.with_input(json!({ "topic": "${input.topic}" }))
        } else {
            step.with_input(json!({
                "topic": "${input.topic}",
                "previous": format!("${{steps.s{}.summary}}", i - 1),
            }))
        };
        builder = builder.step(step);
    }
    builder.build()
}

struct Harness {
    dir: TempDir,
    executor: FakeAgentExecutor,
    orch: TestOrchestrator,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    fn with_config(config: OrchestratorConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let executor = FakeAgentExecutor::new();
        executor.respond("summarize", json!({ "summary": "ok" }));
        let orch = build(&dir, executor.clone(), config, "id");
        Self {
            dir,
            executor,
            orch,
        }
    }

    /// A second orchestrator over the same state dir, as after a restart.
    /// Its ids use another prefix so new effects never collide with old ones.
    fn restart(&self, executor: FakeAgentExecutor) -> TestOrchestrator {
        let orch = build(&self.dir, executor, self.orch.config, "after");
        for definition in self.orch.processes.read().values() {
            orch.register_process(ProcessDefinition::clone(definition)).unwrap();
        }
        orch
    }

    fn register(&self, definition: ProcessDefinition) {
        self.orch.register_process(definition).unwrap();
    }

    async fn start(&self, process: &str) -> RunId {
        self.orch
            .start(process, json!({ "topic": "bridges" }))
            .await
            .unwrap()
    }

    fn state(&self, run_id: &RunId) -> RunState {
        self.orch.state(run_id).unwrap()
    }

    fn run_file(&self, run_id: &RunId, rel: &str) -> std::path::PathBuf {
        self.orch.store().run_dir(run_id).join(rel)
    }
}

fn build(
    dir: &TempDir,
    executor: FakeAgentExecutor,
    config: OrchestratorConfig,
    id_prefix: &str,
) -> TestOrchestrator {
    Orchestrator::new(
        OrchestratorDeps {
            executor,
            store: RunStore::new(dir.path()),
            registry: registry(),
            clock: FakeClock::new(),
            ids: SequentialIdGen::new(id_prefix),
        },
        config,
    )
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
