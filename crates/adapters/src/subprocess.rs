// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{description} failed to start: {source}")]
    Spawn {
        description: String,
        source: std::io::Error,
    },
    #[error("{description} failed: {source}")]
    Io {
        description: String,
        source: std::io::Error,
    },
    #[error("{description} timed out after {}ms", timeout.as_millis())]
    Timeout {
        description: String,
        timeout: Duration,
    },
    #[error("{description} cancelled")]
    Cancelled { description: String },
}

/// Run `cmd` with `stdin` piped in, collecting stdout and stderr.
///
/// The child is killed if the timeout elapses or `cancel` fires. A non-zero
/// exit status is not an error here; callers inspect `Output::status`.
pub async fn run_piped(
    mut cmd: Command,
    stdin: Vec<u8>,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
    description: &str,
) -> Result<Output, SubprocessError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| SubprocessError::Spawn {
        description: description.to_string(),
        source,
    })?;

    // Feed stdin concurrently so a child that writes before reading can't
    // deadlock on a full pipe.
    if let Some(mut pipe) = child.stdin.take() {
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(&stdin).await {
                tracing::debug!(error = %e, "child closed stdin early");
            }
        });
    }

    let wait = child.wait_with_output();
    let deadline = async {
        match timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending::<()>().await,
        }
    };

    // Dropping `wait` drops the child, which kills it
    tokio::select! {
        result = wait => result.map_err(|source| SubprocessError::Io {
            description: description.to_string(),
            source,
        }),
        () = deadline => Err(SubprocessError::Timeout {
            description: description.to_string(),
            timeout: timeout.unwrap_or_default(),
        }),
        () = cancel.cancelled() => Err(SubprocessError::Cancelled {
            description: description.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
