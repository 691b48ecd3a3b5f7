// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::*;
use serde_json::json;
use similar_asserts::assert_eq;
use wp_core::{Decision, FailureReason, RunStatus};

#[tokio::test]
async fn run_waits_at_breakpoint_until_approved() {
    let ws = Workspace::new(&[DESIGN_REVIEW]);
    let run_id = ws.start("design-review", json!({ "span_m": 120 })).await;

    let state = ws.state(&run_id);
    assert_eq!(state.status, RunStatus::WaitingBreakpoint);
    assert_eq!(state.current_step_index, 2);
    assert_eq!(ws.executor.calls().len(), 2);

    let state = ws.orch.resume(&run_id, Decision::approve()).await.unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_results.len(), 5);

    let steps: Vec<String> = ws
        .executor
        .calls()
        .iter()
        .map(|c| c.step_id.to_string())
        .collect();
    assert_eq!(steps, vec!["loads", "units", "intro", "body", "appendix"]);
}

#[tokio::test]
async fn breakpoint_request_shown_to_reviewer() {
    let ws = Workspace::new(&[DESIGN_REVIEW]);
    ws.executor.push(
        "analyze",
        Ok(json!({ "summary": "governed by wind", "artifacts": ["loads.csv"] })),
    );
    let run_id = ws.start("design-review", json!({ "span_m": 120 })).await;

    let request = ws.orch.pending_breakpoint(&run_id).unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({
            "question": "Approve the load analysis before drafting?",
            "title": "Preliminary design",
            "context": {
                "runId": run_id.as_str(),
                "files": [{ "path": "loads.csv", "format": "csv" }],
                "summary": { "loads": "governed by wind", "units": "check ok" }
            }
        })
    );
}

#[tokio::test]
async fn resuming_twice_executes_nothing_twice() {
    let ws = Workspace::new(&[DESIGN_REVIEW]);
    let run_id = ws.start("design-review", json!({ "span_m": 120 })).await;

    ws.orch.resume(&run_id, Decision::approve()).await.unwrap();
    let calls = ws.executor.calls().len();
    let state = ws.orch.resume(&run_id, Decision::approve()).await.unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(ws.executor.calls().len(), calls);
}

#[tokio::test]
async fn rejection_fails_with_reviewer_message() {
    let ws = Workspace::new(&[DESIGN_REVIEW]);
    let run_id = ws.start("design-review", json!({ "span_m": 120 })).await;

    let state = ws
        .orch
        .resume(&run_id, Decision::reject("wind load case missing"))
        .await
        .unwrap();
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(
        state.failure,
        Some(FailureReason::BreakpointRejected {
            title: "Preliminary design".to_string(),
            message: Some("wind load case missing".to_string()),
        })
    );

    let outcome = ws.orch.outcome(&run_id).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("breakpoint_rejected"));
    assert_eq!(outcome.metadata.steps_completed, 2);
}

#[tokio::test]
async fn cancelled_run_ignores_later_approval() {
    let ws = Workspace::new(&[DESIGN_REVIEW]);
    let run_id = ws.start("design-review", json!({ "span_m": 120 })).await;

    let state = ws.orch.cancel(&run_id).await.unwrap();
    assert_eq!(state.status, RunStatus::Cancelled);

    let state = ws.orch.resume(&run_id, Decision::approve()).await.unwrap();
    assert_eq!(state.status, RunStatus::Cancelled);
    assert_eq!(ws.executor.calls().len(), 2);
}
