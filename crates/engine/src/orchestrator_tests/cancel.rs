// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn cancel_while_waiting_at_breakpoint() {
    let h = Harness::new();
    let mut definition = chain("gated", 3);
    definition.add_breakpoint(BreakpointDef::after(1, "Review", "Continue?"));
    h.register(definition);
    let run_id = h.start("gated").await;
    assert_eq!(h.state(&run_id).status, RunStatus::WaitingBreakpoint);

    let state = h.orch.cancel(&run_id).await.unwrap();
    assert_eq!(state.status, RunStatus::Cancelled);
    assert!(h.orch.pending_breakpoint(&run_id).unwrap().is_none());

    // A late approval does not revive the run
    let state = h.orch.resume(&run_id, Decision::approve()).await.unwrap();
    assert_eq!(state.status, RunStatus::Cancelled);
    assert_eq!(h.executor.call_count("summarize"), 1);

    let outcome = h.orch.outcome(&run_id).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("cancelled"));
}

#[tokio::test]
async fn cancel_interrupts_running_executor_call() {
    let h = Harness::new();
    h.executor.delay("summarize", Duration::from_secs(30));
    h.register(chain("slow", 2));

    let orch = h.orch.clone();
    let started = std::time::Instant::now();
    let task = tokio::spawn(async move { orch.start("slow", json!({ "topic": "bridges" })).await });

    // Wait for the first call to reach the executor
    while h.executor.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let run_id = h.executor.calls()[0].run_id.clone();
    let state = h.orch.cancel(&run_id).await.unwrap();
    task.await.unwrap().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(state.status, RunStatus::Cancelled);
    assert!(state.completed_results.is_empty());
    assert!(state.in_flight.is_none());
    assert_eq!(h.executor.call_count("summarize"), 1);
    assert!(h.orch.loaded_runs().is_empty());

    // The interrupted effect never recorded a result
    let effect = &h.executor.calls()[0].effect_id;
    assert!(!h.orch.store().has_result(&run_id, effect));
}

#[tokio::test]
async fn cancel_is_noop_on_finished_run() {
    let h = Harness::new();
    h.register(chain("chain", 1));
    let run_id = h.start("chain").await;

    let state = h.orch.cancel(&run_id).await.unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert!(h.orch.outcome(&run_id).unwrap().success);
}

#[tokio::test]
async fn cancelled_run_stays_cancelled_after_restart() {
    let h = Harness::new();
    let mut definition = chain("gated", 2);
    definition.add_breakpoint(BreakpointDef::after(1, "Review", "Continue?"));
    h.register(definition);
    let run_id = h.start("gated").await;
    h.orch.cancel(&run_id).await.unwrap();

    let executor = FakeAgentExecutor::new();
    let after = h.restart(executor.clone());
    let state = after.recover(&run_id).await.unwrap();
    assert_eq!(state.status, RunStatus::Cancelled);
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn cancel_unknown_run() {
    let h = Harness::new();
    let err = h.orch.cancel(&RunId::new("ghost")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::RunNotFound(id) if id == "ghost"));
}
