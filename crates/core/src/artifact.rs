// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifacts: named output files produced by tasks.
//!
//! Tasks report the files they wrote through an `artifacts` array in their
//! output JSON. Each entry is either a bare path or an object:
//!
//! ```json
//! { "artifacts": ["report.md", { "path": "loads.json", "format": "json", "label": "Load table" }] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    #[default]
    Output,
    /// Produced by the orchestrator when an optional step was skipped.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn output(path: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: format.into(),
            label: None,
            kind: ArtifactKind::Output,
        }
    }

    /// Warning artifact pointing at the record of a failed effect.
    pub fn warning(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: "json".to_string(),
            label: Some(label.into()),
            kind: ArtifactKind::Warning,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.kind == ArtifactKind::Warning
    }
}

/// Guess a format tag from a file extension.
pub fn format_for_path(path: &str) -> String {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("md") | Some("markdown") => "markdown",
        Some("json") => "json",
        Some("yaml") | Some("yml") => "yaml",
        Some("csv") => "csv",
        Some("txt") | Some("log") => "text",
        Some("html") | Some("htm") => "html",
        Some("pdf") => "pdf",
        _ => "file",
    }
    .to_string()
}

/// Read the `artifacts` array from a task output.
///
/// Malformed entries (no usable path) are dropped rather than failing the
/// step; the output itself has already passed schema validation.
pub fn artifacts_from_output(output: &Value) -> Vec<Artifact> {
    let Some(entries) = output.get("artifacts").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(path) if !path.is_empty() => {
                Some(Artifact::output(path.clone(), format_for_path(path)))
            }
            Value::Object(obj) => {
                let path = obj.get("path").and_then(Value::as_str)?;
                if path.is_empty() {
                    return None;
                }
                let format = obj
                    .get("format")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format_for_path(path));
                let label = obj
                    .get("label")
                    .or_else(|| obj.get("title"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some(Artifact {
                    path: path.to_string(),
                    format,
                    label,
                    kind: ArtifactKind::Output,
                })
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
