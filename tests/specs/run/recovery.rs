// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::*;
use serde_json::json;
use similar_asserts::assert_eq;
use wp_core::{Decision, EffectId, RunEvent, RunId, RunStatus};
use wp_storage::TaskResult;

#[tokio::test]
async fn crash_after_result_write_does_not_reexecute() {
    let ws = Workspace::new(&[LINTED_DRAFT]);
    let definition = ws.orch.process("linted-draft").unwrap();
    let store = ws.orch.store();

    // Simulate a process that died after result.json was written but
    // before task:completed reached the journal
    let run_id = RunId::new("run-crash");
    let effect_id = EffectId::new("effect-write");
    let mut log = store
        .create(&RunEvent::RunCreated {
            run_id: run_id.clone(),
            process_id: definition.id.clone(),
            definition_hash: definition.content_hash(),
            input: json!({}),
            step_count: definition.len(),
            created_at_ms: 1,
        })
        .unwrap();
    store.write_input(&run_id, &effect_id, &json!({})).unwrap();
    log.commit(&RunEvent::TaskStarted {
        run_id: run_id.clone(),
        step_index: 0,
        step_id: "write".into(),
        task_id: "compose".into(),
        effect_id: effect_id.clone(),
        attempt: 1,
        started_at_ms: 2,
    })
    .unwrap();
    store
        .write_result(
            &run_id,
            &effect_id,
            &TaskResult::Ok {
                output: json!({ "summary": "written before the crash" }),
            },
        )
        .unwrap();
    drop(log);

    let executor = scripted_executor();
    let restarted = ws.restart(executor.clone());
    let recovered = restarted.recover_all().await.unwrap();

    assert_eq!(recovered.len(), 1);
    assert_eq!(recovered[0].status, RunStatus::Completed);
    assert_eq!(recovered[0].completed_results[0].effect_id, effect_id);

    let steps: Vec<String> = executor.calls().iter().map(|c| c.step_id.to_string()).collect();
    assert_eq!(steps, vec!["lint", "publish"]);
    assert_eq!(executor.calls()[0].input["draft"], "written before the crash");
}

#[tokio::test]
async fn paused_run_reloads_with_same_next_input() {
    let ws = Workspace::new(&[DESIGN_REVIEW]);
    ws.executor
        .push("analyze", Ok(json!({ "summary": "governed by wind" })));
    let run_id = ws.start("design-review", json!({ "span_m": 120 })).await;
    let next_input = ws.orch.next_input(&run_id).unwrap();
    assert_eq!(
        next_input,
        Some(json!({ "topic": "introduction", "analysis": "governed by wind" }))
    );

    let executor = scripted_executor();
    let restarted = ws.restart(executor.clone());
    assert_eq!(restarted.next_input(&run_id).unwrap(), next_input);
    assert_eq!(restarted.state(&run_id).unwrap(), ws.state(&run_id));

    let state = restarted.resume(&run_id, Decision::approve()).await.unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(executor.calls()[0].input, next_input.unwrap());
    assert_eq!(executor.calls().len(), 3);
}

#[tokio::test]
async fn recover_all_leaves_finished_runs_alone() {
    let ws = Workspace::new(&[LINTED_DRAFT, DESIGN_REVIEW]);
    let done = ws.start("linted-draft", json!({})).await;
    let waiting = ws.start("design-review", json!({ "span_m": 40 })).await;

    let executor = scripted_executor();
    let restarted = ws.restart(executor.clone());
    let mut recovered = restarted.recover_all().await.unwrap();
    recovered.sort_by(|a, b| a.run_id.cmp(&b.run_id));

    let summary: Vec<(RunId, RunStatus)> = recovered
        .into_iter()
        .map(|s| (s.run_id, s.status))
        .collect();
    assert_eq!(
        summary,
        vec![
            (done, RunStatus::Completed),
            (waiting, RunStatus::WaitingBreakpoint)
        ]
    );
    assert!(executor.calls().is_empty());
}
