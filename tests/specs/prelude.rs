// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures: a review process file and a scripted workspace.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wp_adapters::FakeAgentExecutor;
use wp_core::{FakeClock, RunId, SequentialIdGen};
use wp_engine::{Orchestrator, OrchestratorConfig, OrchestratorDeps};
use wp_process::{parse_process_file, Format, TaskRegistry};
use wp_storage::{RunState, RunStore};

pub type SpecOrchestrator = Orchestrator<FakeAgentExecutor, FakeClock, SequentialIdGen>;

/// Five steps of a design review, gated after the second.
pub const DESIGN_REVIEW: &str = r#"
[task.analyze]
prompt = { role = "structural engineer", task = "Analyze the load case" }
input_schema = { type = "object", required = ["span_m"], properties = { span_m = { type = "number" } } }
output_schema = { type = "object", required = ["summary"], properties = { summary = { type = "string" } } }

[task.check]
prompt = { task = "Check the analysis for unit errors" }
output_schema = { type = "object", required = ["summary"] }

[task.draft]
prompt = { task = "Draft the report section" }
output_schema = { type = "object", required = ["summary"] }

[process]
id = "design-review"
description = "Analyze, check, and write up a bridge design"

[[process.step]]
id = "loads"
task = "analyze"
input = { span_m = "${input.span_m}" }

[[process.step]]
id = "units"
task = "check"
input = { analysis = "${steps.loads.summary}" }

[[process.step]]
id = "intro"
task = "draft"
input = { topic = "introduction", analysis = "${steps.loads.summary}" }

[[process.step]]
id = "body"
task = "draft"
input = { topic = "body", analysis = "${steps.loads.summary}", review = "${steps.units.summary}" }

[[process.step]]
id = "appendix"
task = "draft"
input = { topic = "appendix" }

[[process.breakpoint]]
after_step = 2
title = "Preliminary design"
question = "Approve the load analysis before drafting?"
context = { loads = "${steps.loads.summary}", units = "${steps.units.summary}" }
"#;

/// Three steps, the middle one optional.
pub const LINTED_DRAFT: &str = r#"
[task.compose]
prompt = { task = "Write the draft" }
output_schema = { type = "object", required = ["summary"] }

[task.lint]
prompt = { task = "Lint the draft" }

[process]
id = "linted-draft"

[[process.step]]
id = "write"
task = "compose"

[[process.step]]
id = "lint"
task = "lint"
optional = true
input = { draft = "${steps.write.summary}" }

[[process.step]]
id = "publish"
task = "compose"
input = { draft = "${steps.write.summary}", notes = "${steps.lint.notes}" }
"#;

/// A scripted executor and a temporary state directory.
pub struct Workspace {
    pub dir: TempDir,
    pub executor: FakeAgentExecutor,
    pub orch: SpecOrchestrator,
    sources: Vec<&'static str>,
    config: OrchestratorConfig,
}

impl Workspace {
    /// A workspace with every process in `sources` registered. Every task
    /// answers `{ "summary": "<task> ok" }` unless scripted otherwise.
    pub fn new(sources: &[&'static str]) -> Self {
        Self::with_config(sources, OrchestratorConfig::default())
    }

    pub fn with_config(sources: &[&'static str], config: OrchestratorConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let executor = scripted_executor();
        let orch = orchestrator(dir.path(), executor.clone(), sources, config, "id");
        Self {
            dir,
            executor,
            orch,
            sources: sources.to_vec(),
            config,
        }
    }

    /// A fresh orchestrator over the same state directory, as after a
    /// process restart.
    pub fn restart(&self, executor: FakeAgentExecutor) -> SpecOrchestrator {
        orchestrator(self.dir.path(), executor, &self.sources, self.config, "restarted")
    }

    pub async fn start(&self, process: &str, input: Value) -> RunId {
        self.orch.start(process, input).await.unwrap()
    }

    pub fn state(&self, run_id: &RunId) -> RunState {
        self.orch.state(run_id).unwrap()
    }

    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.orch.store().run_dir(run_id)
    }
}

pub fn scripted_executor() -> FakeAgentExecutor {
    let executor = FakeAgentExecutor::new();
    for task in ["analyze", "check", "draft", "compose", "lint"] {
        executor.respond(task, json!({ "summary": format!("{task} ok") }));
    }
    executor
}

fn orchestrator(
    state_dir: &Path,
    executor: FakeAgentExecutor,
    sources: &[&str],
    config: OrchestratorConfig,
    id_prefix: &str,
) -> SpecOrchestrator {
    let mut registry = TaskRegistry::new();
    let mut definitions = Vec::new();
    for source in sources {
        let file = parse_process_file(source, Format::Toml).unwrap();
        definitions.push(file.load(&mut registry).unwrap());
    }

    let orch = Orchestrator::new(
        OrchestratorDeps {
            executor,
            store: RunStore::new(state_dir),
            registry,
            clock: FakeClock::new(),
            ids: SequentialIdGen::new(id_prefix),
        },
        config,
    );
    for definition in definitions {
        orch.register_process(definition).unwrap();
    }
    orch
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
