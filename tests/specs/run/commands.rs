// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs carried out by real subprocesses.

use serde_json::json;
use similar_asserts::assert_eq;
use std::time::Duration;
use wp_core::{FailureReason, RunStatus};
use wp_engine::{command_orchestrator, EngineConfig};
use wp_process::{parse_process_file, Format, TaskRegistry};

const SHELL_PIPELINE: &str = r#"
[task.rename]
kind = "script"
command = "sed 's/\"topic\"/\"summary\"/'"
output_schema = { type = "object", required = ["summary"] }

[task.narrate]
prompt = { task = "Describe the step you are running" }
output_schema = { type = "object", required = ["summary"] }

[process]
id = "shell"

[[process.step]]
id = "first"
task = "rename"

[[process.step]]
id = "second"
task = "narrate"
input = { previous = "${steps.first.summary}" }
"#;

fn registry() -> (TaskRegistry, wp_process::ProcessDefinition) {
    let mut registry = TaskRegistry::new();
    let definition = parse_process_file(SHELL_PIPELINE, Format::Toml)
        .unwrap()
        .load(&mut registry)
        .unwrap();
    (registry, definition)
}

#[tokio::test]
async fn script_and_agent_commands_complete_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::new(dir.path())
        .with_agent_command(r#"printf '{"summary":"running %s"}' "$WAYPOINT_STEP_ID""#)
        .with_agent_timeout(Duration::from_secs(30));
    let (registry, definition) = registry();
    let orch = command_orchestrator(&config, registry);
    orch.register_process(definition).unwrap();

    let run_id = orch.start("shell", json!({ "topic": "bridges" })).await.unwrap();
    let state = orch.state(&run_id).unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_results[0].output, json!({ "summary": "bridges" }));
    assert_eq!(state.completed_results[1].output, json!({ "summary": "running second" }));
    assert!(dir.path().join("runs").join(run_id.as_str()).join("journal.jsonl").is_file());
}

#[tokio::test]
async fn agent_without_command_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::new(dir.path());
    let (registry, definition) = registry();
    let orch = command_orchestrator(&config, registry);
    orch.register_process(definition).unwrap();

    let run_id = orch.start("shell", json!({ "topic": "bridges" })).await.unwrap();
    let state = orch.state(&run_id).unwrap();

    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.completed_results.len(), 1);
    assert!(matches!(
        state.failure,
        Some(FailureReason::Agent { ref step_id, .. }) if step_id == "second"
    ));
}
