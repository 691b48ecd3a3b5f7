// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced executor wrapper for consistent observability

use crate::executor::{AgentError, AgentExecutor, AgentRequest};
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Wrapper that adds tracing to any AgentExecutor
#[derive(Clone)]
pub struct TracedExecutor<E> {
    inner: E,
}

impl<E> TracedExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: AgentExecutor> AgentExecutor for TracedExecutor<E> {
    async fn invoke(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> Result<Value, AgentError> {
        let span = tracing::info_span!(
            "executor.invoke",
            run_id = %request.run_id,
            step = %request.step_id,
            task = %request.task_id,
            effect = %request.effect_id,
            attempt = request.attempt,
        );
        async {
            tracing::info!(
                kind = %request.kind,
                prompt_len = request.prompt.as_ref().map_or(0, String::len),
                "starting",
            );
            let start = std::time::Instant::now();
            let result = self.inner.invoke(request, cancel).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "effect finished"),
                Err(AgentError::Cancelled) => tracing::info!(elapsed_ms, "effect cancelled"),
                Err(e) => tracing::error!(elapsed_ms, kind = e.kind(), error = %e, "effect failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
