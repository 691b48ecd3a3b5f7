// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn completed() -> RunEvent {
    RunEvent::TaskCompleted {
        run_id: RunId::new("run-1"),
        step_index: 0,
        step_id: StepId::new("survey"),
        task_id: TaskId::new("site-survey"),
        effect_id: EffectId::new("eff-1"),
        output: json!({ "summary": "ok" }),
        artifacts: vec![],
        finished_at_ms: 42,
    }
}

#[test]
fn events_use_scoped_type_tags() {
    let value = serde_json::to_value(completed()).unwrap();
    assert_eq!(value["type"], "task:completed");
    assert_eq!(value["effect_id"], "eff-1");
    // Empty artifact lists are not written
    assert!(value.get("artifacts").is_none());
}

#[test]
fn task_completed_round_trips_without_artifacts_field() {
    let value = serde_json::to_value(completed()).unwrap();
    let back: RunEvent = serde_json::from_value(value).unwrap();
    assert_eq!(back, completed());
}

#[test]
fn task_started_defaults_attempt_to_one() {
    let event: RunEvent = serde_json::from_value(json!({
        "type": "task:started",
        "run_id": "run-1",
        "step_index": 2,
        "step_id": "review",
        "task_id": "peer-review",
        "effect_id": "eff-3",
        "started_at_ms": 10
    }))
    .unwrap();

    match event {
        RunEvent::TaskStarted { attempt, .. } => assert_eq!(attempt, 1),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn name_matches_serialized_tag() {
    let events = vec![
        completed(),
        RunEvent::RunCompleted {
            run_id: RunId::new("run-1"),
            at_ms: 1,
        },
        RunEvent::BreakpointResolved {
            run_id: RunId::new("run-1"),
            position: 2,
            decision: Decision::approve(),
            at_ms: 1,
        },
    ];
    for event in events {
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], event.name());
        assert_eq!(event.run_id(), "run-1");
    }
}

#[yare::parameterized(
    completed = { RunEvent::RunCompleted { run_id: RunId::new("r"), at_ms: 0 }, true },
    cancelled = { RunEvent::RunCancelled { run_id: RunId::new("r"), at_ms: 0 }, true },
    rejected  = { RunEvent::BreakpointResolved {
        run_id: RunId::new("r"), position: 1, decision: Decision::reject("no"), at_ms: 0,
    }, false },
)]
fn terminal_events(event: RunEvent, terminal: bool) {
    assert_eq!(event.is_terminal(), terminal);
}
