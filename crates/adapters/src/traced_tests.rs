// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::executor::FakeAgentExecutor;
use serde_json::json;
use serial_test::{parallel, serial};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;
use wp_core::{EffectId, RunId, StepId, TaskId};
use wp_process::ExecutionKind;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn assert_log(logs: &str, label: &str, expected: &str) {
    assert!(logs.contains(expected), "Should log {label}. Logs:\n{logs}");
}

fn request(task: &str) -> AgentRequest {
    AgentRequest {
        run_id: RunId::new("run-42"),
        step_id: StepId::new("summarize"),
        task_id: TaskId::new(task),
        effect_id: EffectId::new("eff-7"),
        kind: ExecutionKind::Agent,
        prompt: Some("Summarize".to_string()),
        input: json!({ "doc": "text" }),
        output_schema: json!(true),
        command: None,
        task_dir: PathBuf::from("/tmp"),
        attempt: 2,
    }
}

#[test]
#[serial(tracing)]
fn success_logs_span_and_timing() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeAgentExecutor::new();
        fake.respond("summ", json!({ "summary": "short" }));
        TracedExecutor::new(fake)
            .invoke(request("summ"), CancellationToken::new())
            .await
    });

    assert_eq!(result, Ok(json!({ "summary": "short" })));
    assert_log(&logs, "span name", "executor.invoke");
    assert_log(&logs, "run id", "run_id=run-42");
    assert_log(&logs, "effect id", "effect=eff-7");
    assert_log(&logs, "attempt", "attempt=2");
    assert_log(&logs, "entry message", "starting");
    assert_log(&logs, "completion", "effect finished");
    assert_log(&logs, "timing", "elapsed_ms");
}

#[test]
#[serial(tracing)]
fn failure_logs_error_and_kind() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeAgentExecutor::new();
        fake.fail("summ", AgentError::Timeout(Duration::from_millis(250)));
        TracedExecutor::new(fake)
            .invoke(request("summ"), CancellationToken::new())
            .await
    });

    assert!(result.is_err());
    assert_log(&logs, "failure", "effect failed");
    assert_log(&logs, "error kind", "kind=\"timeout\"");
    assert_log(&logs, "error message", "timed out after 250ms");
}

#[test]
#[serial(tracing)]
fn cancellation_is_not_an_error() {
    let (logs, result) = with_tracing(|| async {
        let cancel = CancellationToken::new();
        cancel.cancel();
        TracedExecutor::new(FakeAgentExecutor::new())
            .invoke(request("summ"), cancel)
            .await
    });

    assert_eq!(result, Err(AgentError::Cancelled));
    assert_log(&logs, "cancel", "effect cancelled");
    assert!(!logs.contains("ERROR"), "Logs:\n{logs}");
}

#[tokio::test]
#[parallel(tracing)]
async fn delegates_to_inner() {
    let fake = FakeAgentExecutor::new();
    let traced = TracedExecutor::new(fake.clone());
    traced
        .invoke(request("summ"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fake.call_count("summ"), 1);
    assert_eq!(traced.inner().calls()[0].attempt, 2);
}
