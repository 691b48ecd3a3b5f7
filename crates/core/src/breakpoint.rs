// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Breakpoint protocol and human decisions.
//!
//! A paused run exposes a [`BreakpointRequest`] to whatever front end reviews
//! it. The wire shape is fixed:
//!
//! ```json
//! {
//!   "question": "Approve the load analysis?",
//!   "title": "Structural review",
//!   "context": {
//!     "runId": "…",
//!     "files": [{ "path": "analysis/loads.md", "format": "markdown" }],
//!     "summary": { … }
//!   }
//! }
//! ```

use crate::id::RunId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointContext {
    pub run_id: RunId,
    #[serde(default)]
    pub files: Vec<FileRef>,
    #[serde(default = "empty_object")]
    pub summary: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointRequest {
    pub question: String,
    pub title: String,
    pub context: BreakpointContext,
}

/// Answer to a breakpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
}

impl Decision {
    pub fn approve() -> Self {
        Self {
            approved: true,
            message: None,
            decided_by: None,
        }
    }

    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            approved: false,
            message: Some(message.into()),
            decided_by: None,
        }
    }

    pub fn by(mut self, reviewer: impl Into<String>) -> Self {
        self.decided_by = Some(reviewer.into());
        self
    }
}

#[cfg(test)]
#[path = "breakpoint_tests.rs"]
mod tests;
