// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::*;
use serde_json::json;
use similar_asserts::assert_eq;
use std::time::Duration;
use wp_adapters::AgentError;
use wp_core::{FailureReason, RunStatus};
use wp_engine::OrchestratorConfig;

#[tokio::test]
async fn output_missing_required_field_fails_run() {
    let ws = Workspace::new(&[DESIGN_REVIEW]);
    ws.executor.push("check", Ok(json!({ "verdict": "fine" })));

    let run_id = ws.start("design-review", json!({ "span_m": 120 })).await;
    let state = ws.state(&run_id);

    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.completed_results.len(), 1);
    assert_eq!(
        state.failure,
        Some(FailureReason::OutputValidation {
            step_id: "units".into(),
            task_id: "check".into(),
            violations: vec!["/: missing required property 'summary'".to_string()],
        })
    );
}

#[tokio::test]
async fn input_outside_contract_fails_before_execution() {
    let ws = Workspace::new(&[DESIGN_REVIEW]);
    let run_id = ws.start("design-review", json!({ "span_m": null })).await;

    let state = ws.state(&run_id);
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.failure.as_ref().map(|f| f.code()), Some("input_validation"));
    assert!(ws.executor.calls().is_empty());
}

#[tokio::test]
async fn optional_step_timeout_leaves_warning_and_continues() {
    let ws = Workspace::new(&[LINTED_DRAFT]);
    ws.executor.fail("lint", AgentError::Timeout(Duration::from_secs(60)));

    let run_id = ws.start("linted-draft", json!({})).await;
    let state = ws.state(&run_id);

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_results.len(), 3);
    assert_eq!(state.warnings.len(), 1);

    let warning = state.artifacts.iter().find(|a| a.is_warning()).unwrap();
    let effect = &state.completed_results[1].effect_id;
    assert_eq!(warning.path, format!("tasks/{effect}/result.json"));
    let record = read_json(&ws.run_dir(&run_id).join(&warning.path));
    assert_eq!(record["kind"], "timeout");

    assert_eq!(ws.executor.calls()[2].input["notes"], json!(null));
}

#[tokio::test]
async fn configured_timeout_bounds_slow_agents() {
    let ws = Workspace::with_config(
        &[LINTED_DRAFT],
        OrchestratorConfig {
            agent_timeout: Some(Duration::from_millis(50)),
            ..OrchestratorConfig::default()
        },
    );
    ws.executor.delay("compose", Duration::from_secs(30));

    let run_id = ws.start("linted-draft", json!({})).await;
    let state = ws.state(&run_id);
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(
        state.failure.map(|f| f.to_string()),
        Some("step write (compose): agent error: timed out after 50ms".to_string())
    );
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let ws = Workspace::with_config(
        &[LINTED_DRAFT],
        OrchestratorConfig {
            agent_attempts: 2,
            ..OrchestratorConfig::default()
        },
    );
    ws.executor
        .push("compose", Err(AgentError::Unavailable("connection reset".into())));

    let run_id = ws.start("linted-draft", json!({})).await;
    assert_eq!(ws.state(&run_id).status, RunStatus::Completed);
    assert_eq!(ws.executor.call_count("compose"), 3);
}
