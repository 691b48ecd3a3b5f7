// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process definitions: ordered steps plus breakpoint markers.

use crate::mapping::{InputMapping, Reference};
use crate::registry::TaskRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;
use wp_core::{FileRef, ProcessId, StepId, TaskId};

/// One task invocation within a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub id: StepId,
    #[serde(rename = "task")]
    pub task_id: TaskId,
    #[serde(default)]
    pub input: InputMapping,
    /// A recoverable agent failure skips the step instead of failing the run.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl ProcessStep {
    pub fn new(id: impl Into<StepId>, task_id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            task_id: task_id.into(),
            input: InputMapping::default(),
            optional: false,
        }
    }

    pub fn with_input(mut self, template: Value) -> Self {
        self.input = InputMapping::new(template);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

fn empty_context() -> InputMapping {
    InputMapping::new(Value::Object(Default::default()))
}

/// A human-approval checkpoint.
///
/// `after_step = N` pauses the run once N steps have completed, so `0` gates
/// the first step and `steps.len()` gates completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointDef {
    pub after_step: usize,
    pub title: String,
    pub question: String,
    /// Summary template shown to the reviewer.
    #[serde(default = "empty_context")]
    pub context: InputMapping,
    /// Files for the reviewer. Paths may contain `${...}` references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileRef>,
}

impl BreakpointDef {
    pub fn after(after_step: usize, title: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            after_step,
            title: title.into(),
            question: question.into(),
            context: empty_context(),
            files: Vec::new(),
        }
    }

    pub fn with_context(mut self, template: Value) -> Self {
        self.context = InputMapping::new(template);
        self
    }

    pub fn with_file(mut self, path: impl Into<String>, format: impl Into<String>) -> Self {
        self.files.push(FileRef {
            path: path.into(),
            format: format.into(),
        });
        self
    }
}

/// An ordered workflow of task steps and breakpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub id: ProcessId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "step")]
    pub steps: Vec<ProcessStep>,
    #[serde(default, rename = "breakpoint", skip_serializing_if = "Vec::is_empty")]
    pub breakpoints: Vec<BreakpointDef>,
    /// Where produced deliverables are expected to land.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

/// Incremental construction of a [`ProcessDefinition`].
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    def: ProcessDefinition,
}

impl ProcessBuilder {
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.def.description = Some(text.into());
        self
    }

    pub fn step(mut self, step: ProcessStep) -> Self {
        self.def.add_step(step);
        self
    }

    pub fn breakpoint(mut self, breakpoint: BreakpointDef) -> Self {
        self.def.add_breakpoint(breakpoint);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.def.output_dir = Some(dir.into());
        self
    }

    /// Finish building. Call [`ProcessDefinition::validate`] before running.
    pub fn build(self) -> ProcessDefinition {
        self.def
    }
}

/// Definition-time problems. `validate` reports all of them at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("process has no steps")]
    EmptyProcess,
    #[error("step '{step}' uses unknown task '{task}'")]
    UnknownTask { step: StepId, task: TaskId },
    #[error("step id '{0}' is used more than once")]
    DuplicateStepId(StepId),
    #[error("step id '{step}' is invalid: {reason}")]
    InvalidStepId { step: StepId, reason: String },
    #[error("{location} references step '{target}' which has not run yet")]
    ForwardReference { location: String, target: StepId },
    #[error("{location} references unknown step '{target}'")]
    UnknownStepReference { location: String, target: StepId },
    #[error("{location}: {message}")]
    InvalidReference { location: String, message: String },
    #[error("breakpoint '{title}' is after step {after_step} but the process has {len} steps")]
    BreakpointOutOfRange {
        title: String,
        after_step: usize,
        len: usize,
    },
    #[error("more than one breakpoint after step {0}")]
    DuplicateBreakpoint(usize),
}

impl ProcessDefinition {
    pub fn builder(id: impl Into<ProcessId>) -> ProcessBuilder {
        ProcessBuilder {
            def: ProcessDefinition {
                id: id.into(),
                description: None,
                steps: Vec::new(),
                breakpoints: Vec::new(),
                output_dir: None,
            },
        }
    }

    pub fn add_step(&mut self, step: ProcessStep) {
        self.steps.push(step);
    }

    pub fn add_breakpoint(&mut self, breakpoint: BreakpointDef) {
        self.breakpoints.push(breakpoint);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// The breakpoint that gates position `index`, if any.
    pub fn breakpoint_at(&self, index: usize) -> Option<&BreakpointDef> {
        self.breakpoints.iter().find(|b| b.after_step == index)
    }

    /// Check the definition against the registry.
    ///
    /// Every task must resolve and every reference must point at a step that
    /// has already completed at the point the template is evaluated.
    pub fn validate(&self, registry: &TaskRegistry) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.steps.is_empty() {
            errors.push(ValidationError::EmptyProcess);
        }

        let positions: HashMap<&str, usize> = self
            .steps
            .iter()
            .enumerate()
            .rev()
            .map(|(i, s)| (s.id.as_str(), i))
            .collect();

        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if !seen.insert(step.id.as_str()) {
                errors.push(ValidationError::DuplicateStepId(step.id.clone()));
            }
            if let Some(reason) = step_id_problem(step.id.as_str()) {
                errors.push(ValidationError::InvalidStepId {
                    step: step.id.clone(),
                    reason: reason.to_string(),
                });
            }
            if !registry.contains(step.task_id.as_str()) {
                errors.push(ValidationError::UnknownTask {
                    step: step.id.clone(),
                    task: step.task_id.clone(),
                });
            }
            let location = format!("step '{}'", step.id);
            check_refs(&step.input, index, &location, &positions, &mut errors);
        }

        let len = self.steps.len();
        let mut gated = HashSet::new();
        for bp in &self.breakpoints {
            if bp.after_step > len {
                errors.push(ValidationError::BreakpointOutOfRange {
                    title: bp.title.clone(),
                    after_step: bp.after_step,
                    len,
                });
            }
            if !gated.insert(bp.after_step) {
                errors.push(ValidationError::DuplicateBreakpoint(bp.after_step));
            }
            let location = format!("breakpoint '{}'", bp.title);
            check_refs(&bp.context, bp.after_step, &location, &positions, &mut errors);
            for file in &bp.files {
                let path = InputMapping::new(Value::String(file.path.clone()));
                check_refs(&path, bp.after_step, &location, &positions, &mut errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Stable sha256 of the definition, recorded on every run.
    pub fn content_hash(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

fn step_id_problem(id: &str) -> Option<&'static str> {
    if id.is_empty() {
        Some("must not be empty")
    } else if id.contains('.') {
        Some("must not contain '.'")
    } else if id.contains(['{', '}', '$']) {
        Some("must not contain '$', '{' or '}'")
    } else {
        None
    }
}

/// Record problems with the references in `mapping`, which is evaluated
/// when `available` steps have completed.
fn check_refs(
    mapping: &InputMapping,
    available: usize,
    location: &str,
    positions: &HashMap<&str, usize>,
    errors: &mut Vec<ValidationError>,
) {
    let refs = match mapping.references() {
        Ok(refs) => refs,
        Err(e) => {
            errors.push(ValidationError::InvalidReference {
                location: location.to_string(),
                message: e.to_string(),
            });
            return;
        }
    };

    for reference in refs {
        let Reference::Step { step, .. } = reference else {
            continue;
        };
        match positions.get(step.as_str()) {
            None => errors.push(ValidationError::UnknownStepReference {
                location: location.to_string(),
                target: step,
            }),
            Some(&pos) if pos >= available => errors.push(ValidationError::ForwardReference {
                location: location.to_string(),
                target: step,
            }),
            Some(_) => {}
        }
    }
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
