// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wp_core::EffectId;
use wp_storage::TaskResult;

/// Persist a run of `definition` whose step 0 was started as `effect` and
/// then interrupted, as if the process died mid-step.
fn interrupted_run(
    h: &Harness,
    definition: &ProcessDefinition,
    effect: &str,
    attempt: u32,
) -> (RunId, EffectId) {
    let run_id = RunId::new("crashed");
    let effect_id = EffectId::new(effect);
    let mut log = h
        .orch
        .store()
        .create(&RunEvent::RunCreated {
            run_id: run_id.clone(),
            process_id: definition.id.clone(),
            definition_hash: definition.content_hash(),
            input: json!({ "topic": "bridges" }),
            step_count: definition.len(),
            created_at_ms: 1,
        })
        .unwrap();
    h.orch
        .store()
        .write_input(&run_id, &effect_id, &json!({ "topic": "bridges" }))
        .unwrap();
    log.commit(&RunEvent::TaskStarted {
        run_id: run_id.clone(),
        step_index: 0,
        step_id: "s0".into(),
        task_id: "summarize".into(),
        effect_id: effect_id.clone(),
        attempt,
        started_at_ms: 2,
    })
    .unwrap();
    (run_id, effect_id)
}

#[tokio::test]
async fn recorded_result_is_committed_without_reinvoking() {
    let h = Harness::new();
    let definition = chain("chain", 2);
    h.register(definition.clone());
    let (run_id, effect_id) = interrupted_run(&h, &definition, "crash-1", 1);
    h.orch
        .store()
        .write_result(
            &run_id,
            &effect_id,
            &TaskResult::Ok {
                output: json!({ "summary": "from before the crash" }),
            },
        )
        .unwrap();

    let executor = FakeAgentExecutor::new();
    executor.respond("summarize", json!({ "summary": "after" }));
    let after = h.restart(executor.clone());
    let state = after.recover(&run_id).await.unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_results[0].effect_id, effect_id);
    assert_eq!(state.completed_results[0].output["summary"], "from before the crash");

    // Only s1 ran, fed the recovered output
    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].step_id, "s1");
    assert_eq!(calls[0].input["previous"], "from before the crash");
}

#[tokio::test]
async fn interrupted_attempt_without_result_is_reexecuted() {
    let h = Harness::new();
    let definition = chain("chain", 1);
    h.register(definition.clone());
    let (run_id, effect_id) = interrupted_run(&h, &definition, "crash-1", 1);

    let executor = FakeAgentExecutor::new();
    executor.respond("summarize", json!({ "summary": "redo" }));
    let after = h.restart(executor.clone());
    let state = after.recover(&run_id).await.unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_ne!(calls[0].effect_id, effect_id);
    assert_eq!(calls[0].attempt, 1);
}

#[tokio::test]
async fn interrupted_attempt_keeps_its_attempt_number() {
    let h = Harness::with_config(OrchestratorConfig {
        agent_attempts: 3,
        ..OrchestratorConfig::default()
    });
    let definition = chain("chain", 1);
    h.register(definition.clone());
    let (run_id, _) = interrupted_run(&h, &definition, "crash-1", 2);

    let executor = FakeAgentExecutor::new();
    executor.fail("summarize", AgentError::Failed("still down".into()));
    let after = h.restart(executor.clone());
    let state = after.recover(&run_id).await.unwrap();

    // Restarts do not refill the retry budget
    assert_eq!(state.status, RunStatus::Failed);
    let attempts: Vec<u32> = executor.calls().iter().map(|c| c.attempt).collect();
    assert_eq!(attempts, [2, 3]);
}

#[tokio::test]
async fn recorded_recoverable_error_resumes_attempt_count() {
    let h = Harness::with_config(OrchestratorConfig {
        agent_attempts: 3,
        ..OrchestratorConfig::default()
    });
    let definition = chain("chain", 1);
    h.register(definition.clone());
    let (run_id, effect_id) = interrupted_run(&h, &definition, "crash-1", 2);
    h.orch
        .store()
        .write_result(
            &run_id,
            &effect_id,
            &TaskResult::Error {
                kind: "timeout".to_string(),
                message: "timed out after 10ms".to_string(),
            },
        )
        .unwrap();

    let executor = FakeAgentExecutor::new();
    executor.respond("summarize", json!({ "summary": "third time" }));
    let after = h.restart(executor.clone());
    let state = after.recover(&run_id).await.unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    let attempts: Vec<u32> = executor.calls().iter().map(|c| c.attempt).collect();
    assert_eq!(attempts, [3]);
}

#[tokio::test]
async fn waiting_run_reloads_identically() {
    let h = Harness::new();
    h.executor
        .push("summarize", Ok(json!({ "summary": "one" })))
        .push("summarize", Ok(json!({ "summary": "two" })));
    let mut definition = chain("gated", 4);
    definition.add_breakpoint(BreakpointDef::after(2, "Review", "Continue?"));
    h.register(definition);
    let run_id = h.start("gated").await;

    let before_state = h.state(&run_id);
    let before_input = h.orch.next_input(&run_id).unwrap();
    let before_request = h.orch.pending_breakpoint(&run_id).unwrap();

    let executor = FakeAgentExecutor::new();
    executor.respond("summarize", json!({ "summary": "later" }));
    let after = h.restart(executor.clone());
    assert!(after.loaded_runs().is_empty());

    assert_eq!(after.state(&run_id).unwrap(), before_state);
    assert_eq!(after.next_input(&run_id).unwrap(), before_input);
    assert_eq!(after.pending_breakpoint(&run_id).unwrap(), before_request);
    assert_eq!(after.loaded_runs(), [run_id.clone()]);

    let state = after.resume(&run_id, Decision::approve()).await.unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert!(after.loaded_runs().is_empty());
    assert_eq!(executor.call_count("summarize"), 2);
    assert_eq!(h.executor.call_count("summarize"), 2);
    assert_eq!(executor.calls()[0].input["previous"], "two");
}

#[tokio::test]
async fn recover_all_skips_unknown_processes() {
    let h = Harness::new();
    let mut gated = chain("gated", 2);
    gated.add_breakpoint(BreakpointDef::after(1, "Review", "Continue?"));
    h.register(gated.clone());
    h.register(chain("other", 1));
    let waiting = h.start("gated").await;
    let finished = h.start("other").await;

    // Only `gated` is known after the restart
    let executor = FakeAgentExecutor::new();
    let after = build(&h.dir, executor.clone(), OrchestratorConfig::default(), "after");
    after.register_process(gated).unwrap();

    let recovered = after.recover_all().await.unwrap();
    assert_eq!(recovered.len(), 1);
    assert_eq!(recovered[0].run_id, waiting);
    assert_eq!(recovered[0].status, RunStatus::WaitingBreakpoint);
    assert!(executor.calls().is_empty());

    let err = after.state(&finished).unwrap_err();
    assert!(matches!(err, OrchestratorError::ProcessNotFound(_)));
}

#[tokio::test]
async fn changed_definition_refuses_to_load() {
    let h = Harness::new();
    let mut gated = chain("gated", 2);
    gated.add_breakpoint(BreakpointDef::after(1, "Review", "Continue?"));
    h.register(gated);
    let run_id = h.start("gated").await;

    let after = build(&h.dir, FakeAgentExecutor::new(), OrchestratorConfig::default(), "after");
    after.register_process(chain("gated", 3)).unwrap();

    let err = after.resume(&run_id, Decision::approve()).await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::DefinitionChanged { ref process_id, .. } if process_id == "gated"
    ));
    assert!(after.recover_all().await.unwrap().is_empty());
}
