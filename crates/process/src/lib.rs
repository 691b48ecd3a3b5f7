// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wp-process: task contracts and process definitions

pub mod definition;
pub mod mapping;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod schema;

pub use definition::{
    BreakpointDef, ProcessBuilder, ProcessDefinition, ProcessStep, ValidationError,
};
pub use mapping::{InputMapping, MappingError, Reference, Scope};
pub use parser::{parse_process_file, read_process_file, Format, ParseError, ProcessFile};
pub use prompt::PromptSpec;
pub use registry::{ExecutionKind, RegistryError, TaskRegistry, TaskSpec};
pub use schema::{check_schema, validate as validate_schema, SchemaError, SchemaViolation};
