// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

/// Five chained steps gated after `after_step`. The summary quotes the
/// latest step when there is one.
fn gated(after_step: usize) -> ProcessDefinition {
    let mut context = json!({ "topic": "${input.topic}" });
    if after_step > 0 {
        context["latest"] = json!(format!("${{steps.s{}.summary}}", after_step - 1));
    }
    let mut definition = chain("gated", 5);
    definition.add_breakpoint(
        BreakpointDef::after(after_step, "Design review", "Approve the preliminary design?")
            .with_context(context)
            .with_file("reports/${run.id}.md", "markdown"),
    );
    definition
}

#[tokio::test]
async fn pauses_at_breakpoint_then_completes_on_approval() {
    let h = Harness::new();
    h.register(gated(2));

    let run_id = h.start("gated").await;
    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::WaitingBreakpoint);
    assert_eq!(state.current_step_index, 2);
    assert_eq!(state.completed_results.len(), 2);
    assert_eq!(h.executor.call_count("summarize"), 2);

    let state = h.orch.resume(&run_id, Decision::approve()).await.unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_results.len(), 5);
    assert_eq!(h.executor.call_count("summarize"), 5);
}

#[tokio::test]
async fn breakpoint_request_has_wire_shape() {
    let h = Harness::new();
    h.executor
        .push("summarize", Ok(json!({ "summary": "one", "artifacts": ["spans.md"] })))
        .push("summarize", Ok(json!({ "summary": "two" })));
    h.register(gated(2));
    let run_id = h.start("gated").await;

    let request = h.orch.pending_breakpoint(&run_id).unwrap().unwrap();
    let doc = serde_json::to_value(&request).unwrap();
    assert_eq!(
        doc,
        json!({
            "question": "Approve the preliminary design?",
            "title": "Design review",
            "context": {
                "runId": run_id.as_str(),
                "files": [
                    { "path": format!("reports/{run_id}.md"), "format": "markdown" },
                    { "path": "spans.md", "format": "markdown" }
                ],
                "summary": { "topic": "bridges", "latest": "two" }
            }
        })
    );
    assert_eq!(h.orch.outcome(&run_id).unwrap().breakpoint, Some(request));
}

#[tokio::test]
async fn repeated_resume_does_not_rerun_steps() {
    let h = Harness::new();
    h.register(gated(2));
    let run_id = h.start("gated").await;

    let first = h.orch.resume(&run_id, Decision::approve()).await.unwrap();
    let second = h.orch.resume(&run_id, Decision::approve()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.executor.call_count("summarize"), 5);

    // Rejecting after the fact changes nothing either
    let third = h.orch.resume(&run_id, Decision::reject("too late")).await.unwrap();
    assert_eq!(third.status, RunStatus::Completed);
}

#[tokio::test]
async fn concurrent_resumes_run_the_next_step_once() {
    let h = Harness::new();
    h.executor.delay("summarize", Duration::from_millis(20));
    h.register(gated(2));
    let run_id = h.start("gated").await;

    let (a, b) = tokio::join!(
        h.orch.resume(&run_id, Decision::approve()),
        h.orch.resume(&run_id, Decision::approve()),
    );
    a.unwrap();
    b.unwrap();

    let steps: Vec<String> = h
        .executor
        .calls()
        .into_iter()
        .map(|c| c.step_id.to_string())
        .collect();
    assert_eq!(steps, ["s0", "s1", "s2", "s3", "s4"]);
    assert_eq!(h.state(&run_id).status, RunStatus::Completed);
}

#[tokio::test]
async fn rejection_fails_the_run() {
    let h = Harness::new();
    h.register(gated(2));
    let run_id = h.start("gated").await;

    let state = h
        .orch
        .resume(&run_id, Decision::reject("loads are off").by("reviewer@example.com"))
        .await
        .unwrap();
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(
        state.failure,
        Some(FailureReason::BreakpointRejected {
            title: "Design review".to_string(),
            message: Some("loads are off".to_string()),
        })
    );
    assert_eq!(state.completed_results.len(), 2);
    assert_eq!(h.executor.call_count("summarize"), 2);

    let outcome = h.orch.outcome(&run_id).unwrap();
    assert_eq!(outcome.error.as_deref(), Some("breakpoint_rejected"));
}

#[yare::parameterized(
    before_first = { 0, 0 },
    after_last   = { 5, 5 },
)]
fn breakpoint_at_edges(after_step: usize, executed_before: usize) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let h = Harness::new();
        h.register(gated(after_step));
        let run_id = h.start("gated").await;

        let state = h.state(&run_id);
        assert_eq!(state.status, RunStatus::WaitingBreakpoint);
        assert_eq!(state.current_step_index, after_step);
        assert_eq!(h.executor.call_count("summarize"), executed_before);

        let state = h.orch.resume(&run_id, Decision::approve()).await.unwrap();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(h.executor.call_count("summarize"), 5);
    });
}

#[tokio::test]
async fn next_input_previews_step_after_breakpoint() {
    let h = Harness::new();
    h.executor
        .push("summarize", Ok(json!({ "summary": "one" })))
        .push("summarize", Ok(json!({ "summary": "two" })));
    h.register(gated(2));
    let run_id = h.start("gated").await;

    assert_eq!(
        h.orch.next_input(&run_id).unwrap(),
        Some(json!({ "topic": "bridges", "previous": "two" }))
    );
    h.orch.resume(&run_id, Decision::approve()).await.unwrap();
    assert_eq!(h.executor.calls()[2].input, json!({ "topic": "bridges", "previous": "two" }));
}

#[tokio::test]
async fn unresolvable_breakpoint_context_fails_run() {
    let h = Harness::new();
    h.executor.respond("summarize", json!({ "summary": "ok" }));
    let mut definition = chain("ctx", 2);
    definition.add_breakpoint(
        BreakpointDef::after(1, "Check", "Go on?").with_context(json!("${steps.s0.missing}")),
    );
    h.register(definition);

    let run_id = h.start("ctx").await;
    let state = h.state(&run_id);
    assert_eq!(state.status, RunStatus::Failed);
    assert!(matches!(
        state.failure,
        Some(FailureReason::BreakpointContext { ref title, .. }) if title == "Check"
    ));
}
