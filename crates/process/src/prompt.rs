// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent prompt specifications and rendering.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The prompt half of a task contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Persona line, e.g. "senior structural engineer".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// What the agent is asked to do.
    pub task: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
    /// Custom layout with `{{task}}` and `{{context}}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl PromptSpec {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Render the prompt for one invocation.
    ///
    /// With a template, `{{task}}` becomes the task text and `{{context}}`
    /// the pretty-printed input. Without one, a fixed layout lists the role,
    /// task, instructions, input and expected output schema.
    pub fn render(&self, input: &Value, output_schema: &Value) -> String {
        let context = pretty(input);
        if let Some(template) = &self.template {
            return template
                .replace("{{task}}", &self.task)
                .replace("{{context}}", &context);
        }

        let mut out = String::new();
        if let Some(role) = &self.role {
            out.push_str(&format!("You are a {role}.\n\n"));
        }
        out.push_str("## Task\n\n");
        out.push_str(self.task.trim_end());
        out.push_str("\n\n");
        if !self.instructions.is_empty() {
            out.push_str("## Instructions\n\n");
            for (i, line) in self.instructions.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, line));
            }
            out.push('\n');
        }
        out.push_str("## Context\n\n```json\n");
        out.push_str(&context);
        out.push_str("\n```\n\n");
        out.push_str("## Output\n\nRespond with a single JSON document matching this schema:\n\n```json\n");
        out.push_str(&pretty(output_schema));
        out.push_str("\n```\n");
        out
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
