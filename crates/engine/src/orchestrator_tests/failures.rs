// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

/// `s0` summarize, `s1` lint (optional), `s2` summarize reading `s1`.
fn with_optional_lint() -> ProcessDefinition {
    ProcessDefinition::builder("review")
        .step(ProcessStep::new("s0", "summarize").with_input(json!({ "topic": "${input.topic}" })))
        .step(
            ProcessStep::new("s1", "lint")
                .with_input(json!({ "draft": "${steps.s0.summary}" }))
                .optional(),
        )
        .step(ProcessStep::new("s2", "summarize").with_input(json!({
            "topic": "${input.topic}",
            "notes": "${steps.s1.notes}",
        })))
        .build()
}

#[tokio::test]
async fn output_missing_required_field_fails_run() {
    let h = Harness::new();
    h.executor
        .push("summarize", Ok(json!({ "summary": "first" })))
        .push("summarize", Ok(json!({ "title": "no summary here" })));
    h.register(chain("chain", 3));

    let run_id = h.start("chain").await;
    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.completed_results.len(), 1);
    assert_eq!(state.current_step_index, 1);
    assert_eq!(
        state.failure,
        Some(FailureReason::OutputValidation {
            step_id: "s1".into(),
            task_id: "summarize".into(),
            violations: vec!["/: missing required property 'summary'".to_string()],
        })
    );
    assert_eq!(h.executor.call_count("summarize"), 2);

    // The raw response is kept for inspection
    let effect = &h.executor.calls()[1].effect_id;
    let stored = read_json(&h.run_file(&run_id, &format!("tasks/{effect}/result.json")));
    assert_eq!(stored["output"]["title"], "no summary here");

    let outcome = h.orch.outcome(&run_id).unwrap();
    assert_eq!(outcome.error.as_deref(), Some("output_validation"));
    assert_eq!(outcome.metadata.steps_completed, 1);
}

#[tokio::test]
async fn input_failing_schema_never_reaches_executor() {
    let h = Harness::new();
    h.register(
        ProcessDefinition::builder("bad-input")
            .step(ProcessStep::new("s0", "summarize").with_input(json!("${input.topic}")))
            .build(),
    );

    let run_id = h.start("bad-input").await;
    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::Failed);
    assert!(matches!(
        state.failure,
        Some(FailureReason::InputValidation { ref step_id, .. }) if step_id == "s0"
    ));
    assert!(h.executor.calls().is_empty());
    assert!(state.in_flight.is_none());
}

#[tokio::test]
async fn missing_mapping_value_fails_run() {
    let h = Harness::new();
    h.register(
        ProcessDefinition::builder("unmapped")
            .step(ProcessStep::new("s0", "summarize").with_input(json!({ "x": "${input.missing}" })))
            .build(),
    );

    let run_id = h.start("unmapped").await;
    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::Failed);
    match state.failure {
        Some(FailureReason::InputMapping { step_id, message }) => {
            assert_eq!(step_id, "s0");
            assert!(message.contains("input.missing"), "{message}");
        }
        other => panic!("unexpected failure: {other:?}"),
    }
    assert!(h.executor.calls().is_empty());
}

#[tokio::test]
async fn optional_step_timeout_is_skipped_with_warning() {
    let h = Harness::new();
    h.executor.fail("lint", AgentError::Timeout(Duration::from_secs(5)));
    h.register(with_optional_lint());

    let run_id = h.start("review").await;
    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_results.len(), 3);

    let skipped = &state.completed_results[1];
    assert_eq!(skipped.step_id, "s1");
    assert_eq!(skipped.output, Value::Null);
    assert_eq!(skipped.skipped.as_deref(), Some("timed out after 5000ms"));
    assert_eq!(state.warnings, ["step s1 skipped: timed out after 5000ms"]);

    // The skipped step reads as null downstream
    assert_eq!(
        h.executor.calls()[2].input,
        json!({ "topic": "bridges", "notes": null })
    );

    let warning = state.artifacts.iter().find(|a| a.is_warning()).unwrap();
    assert_eq!(warning.path, format!("tasks/{}/result.json", skipped.effect_id));
    let stored = read_json(&h.run_file(&run_id, &warning.path));
    assert_eq!(stored["status"], "error");
    assert_eq!(stored["kind"], "timeout");

    let outcome = h.orch.outcome(&run_id).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.metadata.warnings.len(), 1);
}

#[tokio::test]
async fn required_step_error_fails_run() {
    let h = Harness::new();
    h.executor.fail("summarize", AgentError::Failed("model overloaded".into()));
    h.register(chain("chain", 2));

    let run_id = h.start("chain").await;
    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(
        state.failure,
        Some(FailureReason::Agent {
            step_id: "s0".into(),
            task_id: "summarize".into(),
            message: "agent failed: model overloaded".to_string(),
        })
    );
    assert!(state.completed_results.is_empty());
    assert_eq!(h.executor.call_count("summarize"), 1);
}

#[tokio::test]
async fn spontaneous_cancel_is_never_skipped() {
    let h = Harness::new();
    h.executor.fail("lint", AgentError::Cancelled);
    h.register(with_optional_lint());

    let run_id = h.start("review").await;
    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::Failed);
    assert!(matches!(
        state.failure,
        Some(FailureReason::Agent { ref step_id, .. }) if step_id == "s1"
    ));
}

#[tokio::test]
async fn failed_attempts_are_retried_with_new_effects() {
    let h = Harness::with_config(OrchestratorConfig {
        agent_attempts: 3,
        ..OrchestratorConfig::default()
    });
    h.executor
        .push("summarize", Err(AgentError::Failed("flaky".into())))
        .push("summarize", Err(AgentError::Timeout(Duration::from_secs(1))));
    h.register(chain("chain", 1));

    let run_id = h.start("chain").await;
    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::Completed);

    let calls = h.executor.calls();
    let attempts: Vec<u32> = calls.iter().map(|c| c.attempt).collect();
    assert_eq!(attempts, [1, 2, 3]);
    assert_ne!(calls[0].effect_id, calls[1].effect_id);
    assert_eq!(state.completed_results[0].effect_id, calls[2].effect_id);

    let first = read_json(&h.run_file(&run_id, &format!("tasks/{}/result.json", calls[0].effect_id)));
    assert_eq!(first["kind"], "failed");
}

#[tokio::test]
async fn exhausted_attempts_fail_run() {
    let h = Harness::with_config(OrchestratorConfig {
        agent_attempts: 2,
        ..OrchestratorConfig::default()
    });
    h.executor.fail("summarize", AgentError::Unavailable("no agent".into()));
    h.register(chain("chain", 1));

    let run_id = h.start("chain").await;
    assert_eq!(h.state(&run_id).status, RunStatus::Failed);
    assert_eq!(h.executor.call_count("summarize"), 2);
}

#[tokio::test]
async fn configured_timeout_applies_to_every_call() {
    let h = Harness::with_config(OrchestratorConfig {
        agent_timeout: Some(Duration::from_millis(50)),
        ..OrchestratorConfig::default()
    });
    h.executor.delay("lint", Duration::from_secs(30));
    h.register(with_optional_lint());

    let started = std::time::Instant::now();
    let run_id = h.start("review").await;
    assert!(started.elapsed() < Duration::from_secs(10));

    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_results[1].skipped.as_deref(), Some("timed out after 50ms"));
}
