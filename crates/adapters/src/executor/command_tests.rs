// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;
use wp_core::{EffectId, RunId, StepId, TaskId};

fn request(dir: &Path, kind: ExecutionKind) -> AgentRequest {
    AgentRequest {
        run_id: RunId::new("run-1"),
        step_id: StepId::new("draft"),
        task_id: TaskId::new("write"),
        effect_id: EffectId::new("e-1"),
        kind,
        prompt: Some("Write a haiku".to_string()),
        input: json!({ "topic": "rust" }),
        output_schema: json!(true),
        command: None,
        task_dir: dir.to_path_buf(),
        attempt: 1,
    }
}

fn script(dir: &Path, command: &str) -> AgentRequest {
    AgentRequest {
        command: Some(command.to_string()),
        ..request(dir, ExecutionKind::Script)
    }
}

#[tokio::test]
async fn script_receives_input_on_stdin() {
    let dir = tempdir().unwrap();
    let exec = CommandExecutor::new();
    let out = exec
        .invoke(
            script(dir.path(), r#"read line; echo "{\"echo\": $line}""#),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(out, json!({ "echo": { "topic": "rust" } }));
}

#[tokio::test]
async fn agent_receives_prompt_and_env() {
    let dir = tempdir().unwrap();
    let exec = CommandExecutor::new()
        .with_agent_command(r#"p=$(cat); printf 'Sure!\n{"prompt":"%s","run":"%s","effect":"%s"}' "$p" "$WAYPOINT_RUN_ID" "$WAYPOINT_EFFECT_ID""#);
    let out = exec
        .invoke(request(dir.path(), ExecutionKind::Agent), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        out,
        json!({ "prompt": "Write a haiku", "run": "run-1", "effect": "e-1" })
    );
}

#[tokio::test]
async fn runs_inside_task_dir() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("input.json"), r#"{"from":"file"}"#).unwrap();
    let exec = CommandExecutor::new();
    let out = exec
        .invoke(script(dir.path(), "cat input.json"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(out, json!({ "from": "file" }));
}

#[tokio::test]
async fn agent_without_command_is_unavailable() {
    let dir = tempdir().unwrap();
    let err = CommandExecutor::new()
        .invoke(request(dir.path(), ExecutionKind::Agent), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Unavailable(_)));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn nonzero_exit_carries_stderr() {
    let dir = tempdir().unwrap();
    let err = CommandExecutor::new()
        .invoke(
            script(dir.path(), "echo 'model overloaded' >&2; exit 2"),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err, AgentError::Failed("exit 2: model overloaded".to_string()));
}

#[tokio::test]
async fn output_without_json_is_invalid_response() {
    let dir = tempdir().unwrap();
    let err = CommandExecutor::new()
        .invoke(script(dir.path(), "echo all done"), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_response");
}

#[tokio::test]
async fn timeout_maps_to_agent_timeout() {
    let dir = tempdir().unwrap();
    let err = CommandExecutor::new()
        .with_timeout(Duration::from_millis(100))
        .invoke(script(dir.path(), "sleep 10"), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, AgentError::Timeout(Duration::from_millis(100)));
    assert_eq!(err.to_string(), "timed out after 100ms");
}

#[tokio::test]
async fn cancelled_token_maps_to_cancelled() {
    let dir = tempdir().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = CommandExecutor::new()
        .invoke(script(dir.path(), "sleep 10"), cancel)
        .await
        .unwrap_err();
    assert_eq!(err, AgentError::Cancelled);
    assert!(!err.is_recoverable());
}
