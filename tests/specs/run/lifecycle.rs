// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::*;
use serde_json::json;
use similar_asserts::assert_eq;
use std::time::Duration;
use wp_core::RunStatus;
use wp_engine::ArtifactCollector;

#[tokio::test]
async fn three_steps_complete_in_order() {
    let ws = Workspace::new(&[LINTED_DRAFT]);
    ws.executor
        .push("compose", Ok(json!({ "summary": "draft one", "artifacts": ["draft.md"] })))
        .push("lint", Ok(json!({ "notes": "tighten the intro" })));

    let run_id = ws.start("linted-draft", json!({ "title": "Bridges" })).await;
    let state = ws.state(&run_id);

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_results.len(), 3);
    let steps: Vec<&str> = state.completed_results.iter().map(|r| r.step_id.as_str()).collect();
    assert_eq!(steps, vec!["write", "lint", "publish"]);

    let calls = ws.executor.calls();
    assert_eq!(calls[0].input, json!({ "title": "Bridges" }));
    assert_eq!(
        calls[2].input,
        json!({ "draft": "draft one", "notes": "tighten the intro" })
    );
}

#[tokio::test]
async fn outcome_reports_success_and_artifacts() {
    let ws = Workspace::new(&[LINTED_DRAFT]);
    ws.executor.push(
        "compose",
        Ok(json!({
            "summary": "draft one",
            "artifacts": [{ "path": "out/draft.md", "label": "Draft" }]
        })),
    );
    let run_id = ws.start("linted-draft", json!({})).await;

    let outcome = ws.orch.outcome(&run_id).unwrap();
    let doc = serde_json::to_value(&outcome).unwrap();
    assert_eq!(
        doc,
        json!({
            "success": true,
            "metadata": {
                "runId": run_id.as_str(),
                "processId": "linted-draft",
                "status": "completed",
                "stepsCompleted": 3
            },
            "artifacts": [
                { "path": "out/draft.md", "format": "markdown", "label": "Draft", "kind": "output" }
            ]
        })
    );

    let manifest = ArtifactCollector::manifest(&ws.state(&run_id));
    assert_eq!(manifest.outputs.len(), 1);
    assert!(manifest.warnings.is_empty());
}

#[tokio::test]
async fn independent_runs_proceed_concurrently() {
    let ws = Workspace::new(&[LINTED_DRAFT]);
    for task in ["compose", "lint"] {
        ws.executor.delay(task, Duration::from_millis(100));
    }

    // Three runs of three 100ms steps take 900ms back to back
    let started = std::time::Instant::now();
    let (a, b, c) = tokio::join!(
        ws.orch.start("linted-draft", json!({ "n": 1 })),
        ws.orch.start("linted-draft", json!({ "n": 2 })),
        ws.orch.start("linted-draft", json!({ "n": 3 })),
    );
    let elapsed = started.elapsed();

    for run_id in [a.unwrap(), b.unwrap(), c.unwrap()] {
        assert_eq!(ws.state(&run_id).status, RunStatus::Completed);
    }
    assert!(elapsed < Duration::from_millis(700), "took {elapsed:?}");
    assert_eq!(ws.executor.calls().len(), 9);
}

#[tokio::test]
async fn run_directory_layout() {
    let ws = Workspace::new(&[LINTED_DRAFT]);
    let run_id = ws.start("linted-draft", json!({})).await;
    let dir = ws.run_dir(&run_id);

    assert!(dir.join("journal.jsonl").is_file());
    let snapshot = read_json(&dir.join("state.json"));
    assert_eq!(snapshot["state"]["status"], "completed");

    for call in ws.executor.calls() {
        let task_dir = dir.join("tasks").join(call.effect_id.as_str());
        assert!(task_dir.join("input.json").is_file());
        assert_eq!(read_json(&task_dir.join("result.json"))["status"], "ok");
    }
}
