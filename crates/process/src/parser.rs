// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process file parsing (TOML, HCL, and JSON)
//!
//! ```toml
//! [task.research]
//! prompt = { task = "Collect sources", instructions = ["Cite everything"] }
//! output_schema = { type = "object", required = ["summary"] }
//!
//! [process]
//! id = "report"
//!
//! [[process.step]]
//! id = "research"
//! task = "research"
//!
//! [[process.breakpoint]]
//! after_step = 1
//! title = "Sources"
//! question = "Are the sources sufficient?"
//! ```

use crate::definition::{ProcessDefinition, ValidationError};
use crate::registry::{RegistryError, TaskRegistry, TaskSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use wp_core::TaskId;

/// Process file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Hcl,
    Json,
}

impl Format {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Format::Toml),
            "hcl" => Some(Format::Hcl),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HCL parse error: {0}")]
    Hcl(#[from] hcl::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("unrecognized process file extension: {0}")]
    UnknownFormat(String),

    #[error("invalid format for {location}: {message}")]
    InvalidFormat { location: String, message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("process '{process}' is invalid:\n{}", join_errors(errors))]
    Invalid {
        process: String,
        errors: Vec<ValidationError>,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A parsed process file: task contracts plus one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessFile {
    #[serde(default, rename = "task")]
    pub tasks: IndexMap<String, TaskSpec>,
    pub process: ProcessDefinition,
}

impl ProcessFile {
    /// Register the file's tasks and return its validated process.
    pub fn load(self, registry: &mut TaskRegistry) -> Result<ProcessDefinition, ParseError> {
        for (_, spec) in self.tasks {
            registry.register(spec)?;
        }
        self.process
            .validate(registry)
            .map_err(|errors| ParseError::Invalid {
                process: self.process.id.to_string(),
                errors,
            })?;
        Ok(self.process)
    }
}

/// Parse a process file from the given content in the specified format
pub fn parse_process_file(content: &str, format: Format) -> Result<ProcessFile, ParseError> {
    let mut file: ProcessFile = match format {
        Format::Toml => toml::from_str(content)?,
        Format::Hcl => hcl::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    };

    // Inject map keys into task ids
    for (key, spec) in &mut file.tasks {
        if spec.id.as_str().is_empty() {
            spec.id = TaskId::new(key.clone());
        } else if spec.id.as_str() != key {
            return Err(ParseError::InvalidFormat {
                location: format!("task.{key}"),
                message: format!("id '{}' does not match table key", spec.id),
            });
        }
    }

    if file.process.id.as_str().is_empty() {
        return Err(ParseError::InvalidFormat {
            location: "process".to_string(),
            message: "id must not be empty".to_string(),
        });
    }

    Ok(file)
}

/// Read and parse a process file, picking the format from its extension.
pub fn read_process_file(path: &Path) -> Result<ProcessFile, ParseError> {
    let format = Format::from_path(path)
        .ok_or_else(|| ParseError::UnknownFormat(path.display().to_string()))?;
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::debug!(path = %path.display(), ?format, "parsing process file");
    parse_process_file(&content, format)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
