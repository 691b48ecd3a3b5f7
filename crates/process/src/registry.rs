// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task specifications and the registry that owns them.

use crate::prompt::PromptSpec;
use crate::schema::{self, SchemaError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use wp_core::TaskId;

/// How a task is carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionKind {
    /// Delegated to an agent via a rendered prompt.
    #[default]
    Agent,
    /// A local command fed the input JSON on stdin.
    Script,
}

impl std::fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionKind::Agent => write!(f, "agent"),
            ExecutionKind::Script => write!(f, "script"),
        }
    }
}

fn any_schema() -> Value {
    Value::Bool(true)
}

/// A typed contract for one unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Injected from the map key when loaded from a file.
    #[serde(default)]
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub prompt: PromptSpec,
    #[serde(default = "any_schema")]
    pub input_schema: Value,
    #[serde(default = "any_schema")]
    pub output_schema: Value,
    #[serde(default, rename = "kind")]
    pub execution_kind: ExecutionKind,
    /// Script to run for `kind = "script"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub labels: BTreeSet<String>,
}

impl TaskSpec {
    /// An agent task accepting any input and producing any output.
    pub fn agent(id: impl Into<TaskId>, prompt: PromptSpec) -> Self {
        Self {
            id: id.into(),
            title: None,
            prompt,
            input_schema: any_schema(),
            output_schema: any_schema(),
            execution_kind: ExecutionKind::Agent,
            command: None,
            labels: BTreeSet::new(),
        }
    }

    /// A script task running `command`.
    pub fn script(id: impl Into<TaskId>, command: impl Into<String>) -> Self {
        Self {
            execution_kind: ExecutionKind::Script,
            command: Some(command.into()),
            ..Self::agent(id, PromptSpec::default())
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = schema;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    /// Title for display, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("task '{0}' is already registered")]
    DuplicateTaskId(TaskId),
    #[error("unknown task '{0}'")]
    UnknownTaskId(TaskId),
    #[error("task '{task}' has an invalid {which} schema at {path}: {message}")]
    InvalidSchema {
        task: TaskId,
        which: &'static str,
        path: String,
        message: String,
    },
    #[error("script task '{0}' has no command")]
    MissingCommand(TaskId),
}

/// Read-only catalogue of task specifications, keyed by id.
///
/// Built once at load time and shared as `Arc<TaskRegistry>`.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskId, TaskSpec>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Both schemas must be well formed.
    pub fn register(&mut self, spec: TaskSpec) -> Result<(), RegistryError> {
        if self.tasks.contains_key(&spec.id) {
            return Err(RegistryError::DuplicateTaskId(spec.id));
        }
        check(&spec, "input", &spec.input_schema)?;
        check(&spec, "output", &spec.output_schema)?;
        if spec.execution_kind == ExecutionKind::Script
            && spec.command.as_deref().is_none_or(|c| c.trim().is_empty())
        {
            return Err(RegistryError::MissingCommand(spec.id));
        }

        tracing::debug!(task_id = %spec.id, kind = %spec.execution_kind, "registered task");
        self.tasks.insert(spec.id.clone(), spec);
        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Result<&TaskSpec, RegistryError> {
        self.tasks
            .get(id)
            .ok_or_else(|| RegistryError::UnknownTaskId(TaskId::new(id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&TaskId> {
        let mut ids: Vec<_> = self.tasks.keys().collect();
        ids.sort();
        ids
    }
}

fn check(spec: &TaskSpec, which: &'static str, schema: &Value) -> Result<(), RegistryError> {
    schema::check_schema(schema).map_err(|SchemaError { path, message }| {
        RegistryError::InvalidSchema {
            task: spec.id.clone(),
            which,
            path,
            message,
        }
    })
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
