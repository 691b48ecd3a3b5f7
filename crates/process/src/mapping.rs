// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input mappings: JSON templates that build a step's input from prior results.
//!
//! A mapping is ordinary JSON in which string values may contain `${ref}`
//! placeholders:
//!
//! - `${input}` / `${input.project.name}`: the run's initial input
//! - `${steps.<step_id>}` / `${steps.<step_id>.summary}`: a prior step's output
//! - `${run.id}`, `${run.process}`: run metadata
//!
//! A string that is exactly one placeholder is replaced by the referenced
//! value with its JSON type intact. A placeholder embedded in longer text is
//! replaced by its textual form. Path segments that parse as integers index
//! into arrays.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;
use wp_core::StepId;

/// Matches `${...}` placeholders.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
pub static REF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("constant regex pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("invalid reference ${{{reference}}}: {message}")]
    Invalid { reference: String, message: String },
    #[error("reference ${{{reference}}} did not resolve to a value")]
    Missing { reference: String },
}

/// A parsed placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Input(Vec<String>),
    Step { step: StepId, path: Vec<String> },
    RunId,
    ProcessId,
}

impl Reference {
    pub fn parse(text: &str) -> Result<Self, MappingError> {
        let invalid = |message: &str| MappingError::Invalid {
            reference: text.to_string(),
            message: message.to_string(),
        };

        let mut parts = text.trim().split('.');
        let head = parts.next().unwrap_or_default();
        let rest: Vec<String> = parts.map(str::to_string).collect();
        if rest.iter().any(String::is_empty) {
            return Err(invalid("empty path segment"));
        }

        match head {
            "input" => Ok(Reference::Input(rest)),
            "steps" => {
                let mut rest = rest.into_iter();
                let step = rest.next().ok_or_else(|| invalid("missing step id"))?;
                Ok(Reference::Step {
                    step: StepId::new(step),
                    path: rest.collect(),
                })
            }
            "run" => match rest.as_slice() {
                [field] if field == "id" => Ok(Reference::RunId),
                [field] if field == "process" => Ok(Reference::ProcessId),
                _ => Err(invalid("expected run.id or run.process")),
            },
            "" => Err(invalid("empty reference")),
            _ => Err(invalid("unknown namespace; expected input, steps or run")),
        }
    }

    /// Step this reference reads from, if any.
    pub fn step(&self) -> Option<&StepId> {
        match self {
            Reference::Step { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// Values a mapping can read from while it is resolved.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub run_id: &'a str,
    pub process_id: &'a str,
    pub input: &'a Value,
    pub steps: &'a HashMap<&'a str, &'a Value>,
}

impl Scope<'_> {
    fn lookup(&self, reference: &Reference, text: &str) -> Result<Value, MappingError> {
        let missing = || MappingError::Missing {
            reference: text.to_string(),
        };
        match reference {
            Reference::RunId => Ok(Value::String(self.run_id.to_string())),
            Reference::ProcessId => Ok(Value::String(self.process_id.to_string())),
            Reference::Input(path) => walk(self.input, path).cloned().ok_or_else(missing),
            Reference::Step { step, path } => {
                let output = self.steps.get(step.as_str()).ok_or_else(missing)?;
                // A skipped optional step reads as null all the way down
                if output.is_null() {
                    return Ok(Value::Null);
                }
                walk(output, path).cloned().ok_or_else(missing)
            }
        }
    }
}

fn walk<'v>(mut value: &'v Value, path: &[String]) -> Option<&'v Value> {
    for segment in path {
        value = match value {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

/// A JSON template for a step input or breakpoint summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputMapping(pub Value);

impl Default for InputMapping {
    /// Pass the run input through unchanged.
    fn default() -> Self {
        Self(Value::String("${input}".to_string()))
    }
}

impl From<Value> for InputMapping {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl InputMapping {
    pub fn new(template: Value) -> Self {
        Self(template)
    }

    /// Every placeholder in the template, in document order.
    pub fn references(&self) -> Result<Vec<Reference>, MappingError> {
        let mut refs = Vec::new();
        collect_refs(&self.0, &mut refs)?;
        Ok(refs)
    }

    /// Build a concrete value from the template.
    pub fn resolve(&self, scope: &Scope<'_>) -> Result<Value, MappingError> {
        resolve_value(&self.0, scope)
    }
}

fn collect_refs(value: &Value, out: &mut Vec<Reference>) -> Result<(), MappingError> {
    match value {
        Value::String(s) => {
            for cap in REF_PATTERN.captures_iter(s) {
                out.push(Reference::parse(&cap[1])?);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, out)?;
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_refs(item, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn resolve_value(value: &Value, scope: &Scope<'_>) -> Result<Value, MappingError> {
    match value {
        Value::String(s) => resolve_string(s, scope),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut resolved = Map::with_capacity(map.len());
            for (key, item) in map {
                resolved.insert(key.clone(), resolve_value(item, scope)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(s: &str, scope: &Scope<'_>) -> Result<Value, MappingError> {
    // Whole-string placeholder keeps the referenced JSON type
    if let Some(cap) = REF_PATTERN.captures(s) {
        if cap.get(0).is_some_and(|m| m.as_str().len() == s.len()) {
            let text = &cap[1];
            return scope.lookup(&Reference::parse(text)?, text);
        }
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for cap in REF_PATTERN.captures_iter(s) {
        let Some(whole) = cap.get(0) else {
            continue;
        };
        let text = &cap[1];
        let value = scope.lookup(&Reference::parse(text)?, text)?;
        out.push_str(&s[last..whole.start()]);
        match value {
            Value::String(v) => out.push_str(&v),
            Value::Null => {}
            other => out.push_str(&other.to_string()),
        }
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Ok(Value::String(out))
}

#[cfg(test)]
#[path = "mapping_tests.rs"]
mod tests;
