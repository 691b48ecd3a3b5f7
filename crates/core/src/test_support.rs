// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    Artifact, BreakpointContext, BreakpointRequest, Decision, EffectId, FailureReason, ProcessId,
    RunEvent, RunId, StepId, TaskId,
};
use serde_json::{json, Value};

// ── Event factory functions ─────────────────────────────────────────────────

pub fn run_created_event(run_id: &str, step_count: usize) -> RunEvent {
    RunEvent::RunCreated {
        run_id: RunId::new(run_id),
        process_id: ProcessId::new("test-process"),
        definition_hash: "testhash".to_string(),
        input: json!({ "project": "test" }),
        step_count,
        created_at_ms: 1_000_000,
    }
}

pub fn task_started_event(run_id: &str, step_index: usize, step: &str, effect: &str) -> RunEvent {
    RunEvent::TaskStarted {
        run_id: RunId::new(run_id),
        step_index,
        step_id: StepId::new(step),
        task_id: TaskId::new(format!("{step}-task")),
        effect_id: EffectId::new(effect),
        attempt: 1,
        started_at_ms: 1_000_100,
    }
}

pub fn task_completed_event(
    run_id: &str,
    step_index: usize,
    step: &str,
    effect: &str,
    output: Value,
) -> RunEvent {
    RunEvent::TaskCompleted {
        run_id: RunId::new(run_id),
        step_index,
        step_id: StepId::new(step),
        task_id: TaskId::new(format!("{step}-task")),
        effect_id: EffectId::new(effect),
        artifacts: crate::artifacts_from_output(&output),
        output,
        finished_at_ms: 1_000_200,
    }
}

pub fn task_skipped_event(run_id: &str, step_index: usize, step: &str, effect: &str) -> RunEvent {
    RunEvent::TaskSkipped {
        run_id: RunId::new(run_id),
        step_index,
        step_id: StepId::new(step),
        task_id: TaskId::new(format!("{step}-task")),
        effect_id: EffectId::new(effect),
        warning: "agent timed out".to_string(),
        finished_at_ms: 1_000_200,
    }
}

pub fn breakpoint_request(run_id: &str, title: &str) -> BreakpointRequest {
    BreakpointRequest {
        question: format!("Approve {title}?"),
        title: title.to_string(),
        context: BreakpointContext {
            run_id: RunId::new(run_id),
            files: vec![],
            summary: json!({}),
        },
    }
}

pub fn breakpoint_reached_event(run_id: &str, position: usize) -> RunEvent {
    RunEvent::BreakpointReached {
        run_id: RunId::new(run_id),
        position,
        request: breakpoint_request(run_id, "gate"),
        at_ms: 1_000_300,
    }
}

pub fn breakpoint_resolved_event(run_id: &str, position: usize, decision: Decision) -> RunEvent {
    RunEvent::BreakpointResolved {
        run_id: RunId::new(run_id),
        position,
        decision,
        at_ms: 1_000_400,
    }
}

pub fn run_failed_event(run_id: &str, reason: FailureReason) -> RunEvent {
    RunEvent::RunFailed {
        run_id: RunId::new(run_id),
        reason,
        at_ms: 1_000_500,
    }
}

pub fn run_completed_event(run_id: &str) -> RunEvent {
    RunEvent::RunCompleted {
        run_id: RunId::new(run_id),
        at_ms: 1_000_600,
    }
}

pub fn run_cancelled_event(run_id: &str) -> RunEvent {
    RunEvent::RunCancelled {
        run_id: RunId::new(run_id),
        at_ms: 1_000_600,
    }
}

pub fn report_output(path: &str) -> Value {
    json!({ "summary": "done", "artifacts": [path] })
}

pub fn sample_artifact(path: &str) -> Artifact {
    Artifact::output(path, crate::format_for_path(path))
}
