// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn three_steps_run_to_completion() {
    let h = Harness::new();
    h.executor
        .push("summarize", Ok(json!({ "summary": "first" })))
        .push("summarize", Ok(json!({ "summary": "second" })));
    h.register(chain("chain", 3));

    let run_id = h.start("chain").await;
    let state = h.state(&run_id);

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_results.len(), 3);
    assert_eq!(state.current_step_index, 3);
    assert!(state.in_flight.is_none());
    assert_eq!(h.executor.call_count("summarize"), 3);

    // Each step saw its predecessor's output
    let calls = h.executor.calls();
    assert_eq!(calls[0].input, json!({ "topic": "bridges" }));
    assert_eq!(calls[1].input, json!({ "topic": "bridges", "previous": "first" }));
    assert_eq!(calls[2].input, json!({ "topic": "bridges", "previous": "second" }));
}

#[tokio::test]
async fn every_effect_persists_input_and_result() {
    let h = Harness::new();
    h.register(chain("chain", 2));
    let run_id = h.start("chain").await;

    for result in &h.state(&run_id).completed_results {
        let task = format!("tasks/{}", result.effect_id);
        let input = read_json(&h.run_file(&run_id, &format!("{task}/input.json")));
        assert_eq!(input["topic"], "bridges");

        let stored = read_json(&h.run_file(&run_id, &format!("{task}/result.json")));
        assert_eq!(stored, json!({ "status": "ok", "output": { "summary": "ok" } }));
    }
    assert!(h.run_file(&run_id, "journal.jsonl").is_file());
    assert!(h.run_file(&run_id, "state.json").is_file());
}

#[tokio::test]
async fn agent_prompt_is_rendered_from_input() {
    let h = Harness::new();
    h.register(chain("chain", 1));
    h.start("chain").await;

    let prompt = h.executor.calls()[0].prompt.clone().unwrap();
    assert!(prompt.starts_with("You are a technical writer."), "{prompt}");
    assert!(prompt.contains("Summarize the material"));
    assert!(prompt.contains("\"topic\": \"bridges\""));
    assert!(prompt.contains("\"required\""));
}

#[tokio::test]
async fn script_tasks_get_no_prompt() {
    let h = Harness::new();
    h.register(
        ProcessDefinition::builder("scripted")
            .step(ProcessStep::new("copy", "echo"))
            .build(),
    );
    let run_id = h.start("scripted").await;

    assert!(h.executor.calls()[0].prompt.is_none());
    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::Completed);
    // Default mapping passes the run input through
    assert_eq!(state.completed_results[0].output, json!({ "topic": "bridges" }));
}

#[tokio::test]
async fn artifacts_collected_in_order() {
    let h = Harness::new();
    h.executor
        .push("summarize", Ok(json!({ "summary": "a", "artifacts": ["plan.md"] })))
        .push(
            "summarize",
            Ok(json!({
                "summary": "b",
                "artifacts": [{ "path": "loads.json", "label": "Load table" }, "notes.txt"]
            })),
        );
    h.register(chain("chain", 2));
    let run_id = h.start("chain").await;

    let paths: Vec<String> = h
        .orch
        .artifacts(&run_id)
        .unwrap()
        .into_iter()
        .map(|a| a.path)
        .collect();
    assert_eq!(paths, ["plan.md", "loads.json", "notes.txt"]);

    let outcome = h.orch.outcome(&run_id).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.metadata.steps_completed, 2);
    assert_eq!(outcome.artifacts.len(), 3);
}

#[tokio::test]
async fn step_on_finished_run_is_noop() {
    let h = Harness::new();
    h.register(chain("chain", 1));
    let run_id = h.start("chain").await;

    let before = h.state(&run_id);
    let after = h.orch.step(&run_id).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(h.executor.call_count("summarize"), 1);
    assert_eq!(h.orch.next_input(&run_id).unwrap(), None);
}

#[tokio::test]
async fn start_unknown_process() {
    let h = Harness::new();
    let err = h.orch.start("nope", json!({})).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::ProcessNotFound(id) if id == "nope"));
}

#[test]
fn register_rejects_invalid_definition() {
    let h = Harness::new();
    let definition = ProcessDefinition::builder("broken")
        .step(ProcessStep::new("a", "missing-task"))
        .step(ProcessStep::new("b", "summarize").with_input(json!("${steps.c}")))
        .build();

    let err = h.orch.register_process(definition).unwrap_err();
    let OrchestratorError::InvalidProcess { errors, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(errors.len(), 2);
    assert!(err.to_string().starts_with("process 'broken' is invalid:\n  - "));
}

#[test]
fn reregistering_same_definition_is_ok() {
    let h = Harness::new();
    h.register(chain("chain", 2));
    h.orch.register_process(chain("chain", 2)).unwrap();

    let err = h.orch.register_process(chain("chain", 3)).unwrap_err();
    assert!(matches!(err, OrchestratorError::DuplicateProcess(_)));
}

#[tokio::test]
async fn unknown_run() {
    let h = Harness::new();
    let ghost = RunId::new("ghost");
    assert!(matches!(
        h.orch.state(&ghost).unwrap_err(),
        OrchestratorError::RunNotFound(_)
    ));
    assert!(matches!(
        h.orch.resume(&ghost, Decision::approve()).await.unwrap_err(),
        OrchestratorError::RunNotFound(_)
    ));
}

#[tokio::test]
async fn independent_runs_execute_concurrently() {
    let h = Harness::new();
    h.executor.delay("summarize", Duration::from_millis(200));
    h.register(chain("chain", 2));

    let mut tasks = Vec::new();
    for topic in ["a", "b", "c", "d"] {
        let orch = h.orch.clone();
        tasks.push(tokio::spawn(async move {
            orch.start("chain", json!({ "topic": topic })).await
        }));
    }
    let started = std::time::Instant::now();
    let mut run_ids = Vec::new();
    for task in tasks {
        run_ids.push(task.await.unwrap().unwrap());
    }

    // Four runs of two 200ms steps each would take 1.6s back to back
    assert!(started.elapsed() < Duration::from_millis(1200));
    for run_id in &run_ids {
        let state = h.state(run_id);
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.completed_results.len(), 2);
    }
    assert!(h.orch.loaded_runs().is_empty());
}

#[tokio::test]
async fn finished_runs_are_released_and_reload_on_query() {
    let h = Harness::new();
    h.executor.respond("summarize", json!({ "summary": "ok" }));
    h.register(chain("chain", 1));

    let mut run_ids = Vec::new();
    for _ in 0..5 {
        run_ids.push(h.start("chain").await);
    }
    assert!(h.orch.loaded_runs().is_empty());

    for run_id in &run_ids {
        assert_eq!(h.state(run_id).status, RunStatus::Completed);
        assert!(h.orch.outcome(run_id).unwrap().success);
    }
    assert!(h.orch.loaded_runs().is_empty());
}
