// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON Schema subset used for task input/output contracts.
//!
//! Supported keywords: `type`, `properties`, `required`,
//! `additionalProperties`, `items`, `enum`, `const`, `anyOf`, `allOf`,
//! `oneOf`, `not`, `minimum`, `maximum`, `exclusiveMinimum`,
//! `exclusiveMaximum`, `minLength`, `maxLength`, `pattern`, `minItems`,
//! `maxItems`. Annotation keywords (`$schema`, `title`, `description`,
//! `format`, `default`, `examples`, ...) are accepted and ignored.
//!
//! Paths in both error types are JSON pointers (`/properties/summary/type`,
//! `/artifacts/0/path`); the document root is reported as `/`.

use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

const TYPE_NAMES: &[&str] = &[
    "null", "boolean", "object", "array", "number", "integer", "string",
];

const SUBSCHEMA_LISTS: &[&str] = &["anyOf", "allOf", "oneOf"];
const SUBSCHEMAS: &[&str] = &["items", "additionalProperties", "not"];
const NUMBER_BOUNDS: &[&str] = &["minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum"];
const COUNT_BOUNDS: &[&str] = &["minLength", "maxLength", "minItems", "maxItems"];

/// A schema document that is not a well-formed schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

/// One way an instance fails its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub pointer: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", display_pointer(&self.pointer), self.message)
    }
}

fn display_pointer(pointer: &str) -> &str {
    if pointer.is_empty() {
        "/"
    } else {
        pointer
    }
}

fn child(pointer: &str, token: &str) -> String {
    let escaped = token.replace('~', "~0").replace('/', "~1");
    format!("{pointer}/{escaped}")
}

fn schema_error(path: &str, message: impl Into<String>) -> SchemaError {
    SchemaError {
        path: display_pointer(path).to_string(),
        message: message.into(),
    }
}

/// Check that `schema` is a well-formed schema document.
pub fn check_schema(schema: &Value) -> Result<(), SchemaError> {
    check_at(schema, "")
}

fn check_at(schema: &Value, path: &str) -> Result<(), SchemaError> {
    let obj = match schema {
        Value::Bool(_) => return Ok(()),
        Value::Object(obj) => obj,
        _ => return Err(schema_error(path, "schema must be an object or a boolean")),
    };

    if let Some(ty) = obj.get("type") {
        check_type_keyword(ty, &child(path, "type"))?;
    }

    if let Some(props) = obj.get("properties") {
        let props_path = child(path, "properties");
        let Value::Object(props) = props else {
            return Err(schema_error(&props_path, "must be an object"));
        };
        for (name, sub) in props {
            check_at(sub, &child(&props_path, name))?;
        }
    }

    if let Some(required) = obj.get("required") {
        let is_string_list = required
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string));
        if !is_string_list {
            return Err(schema_error(
                &child(path, "required"),
                "must be an array of strings",
            ));
        }
    }

    for &key in SUBSCHEMAS {
        if let Some(sub) = obj.get(key) {
            check_at(sub, &child(path, key))?;
        }
    }

    for &key in SUBSCHEMA_LISTS {
        if let Some(list) = obj.get(key) {
            let list_path = child(path, key);
            match list.as_array() {
                Some(items) if !items.is_empty() => {
                    for (i, sub) in items.iter().enumerate() {
                        check_at(sub, &child(&list_path, &i.to_string()))?;
                    }
                }
                _ => return Err(schema_error(&list_path, "must be a non-empty array")),
            }
        }
    }

    if let Some(values) = obj.get("enum") {
        if !values.as_array().is_some_and(|v| !v.is_empty()) {
            return Err(schema_error(&child(path, "enum"), "must be a non-empty array"));
        }
    }

    for &key in NUMBER_BOUNDS {
        if obj.get(key).is_some_and(|v| !v.is_number()) {
            return Err(schema_error(&child(path, key), "must be a number"));
        }
    }

    for &key in COUNT_BOUNDS {
        if obj.get(key).is_some_and(|v| v.as_u64().is_none()) {
            return Err(schema_error(
                &child(path, key),
                "must be a non-negative integer",
            ));
        }
    }

    if let Some(pattern) = obj.get("pattern") {
        let pattern_path = child(path, "pattern");
        let Some(pattern) = pattern.as_str() else {
            return Err(schema_error(&pattern_path, "must be a string"));
        };
        if let Err(e) = Regex::new(pattern) {
            return Err(schema_error(&pattern_path, format!("invalid regex: {e}")));
        }
    }

    Ok(())
}

fn check_type_keyword(ty: &Value, path: &str) -> Result<(), SchemaError> {
    let known = |name: &str| TYPE_NAMES.contains(&name);
    match ty {
        Value::String(name) if known(name.as_str()) => Ok(()),
        Value::String(name) => Err(schema_error(path, format!("unknown type '{name}'"))),
        Value::Array(names) if !names.is_empty() => {
            for name in names {
                match name.as_str() {
                    Some(n) if known(n) => {}
                    _ => return Err(schema_error(path, format!("unknown type {name}"))),
                }
            }
            Ok(())
        }
        _ => Err(schema_error(
            path,
            "must be a type name or a non-empty array of type names",
        )),
    }
}

/// Validate `instance` against `schema`, collecting every violation.
///
/// The schema is assumed to have passed [`check_schema`]; malformed keywords
/// are skipped rather than reported here.
pub fn validate(schema: &Value, instance: &Value) -> Result<(), Vec<SchemaViolation>> {
    let mut violations = Vec::new();
    validate_at(schema, instance, "", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// True when `instance` satisfies `schema`.
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    validate(schema, instance).is_ok()
}

fn violation(out: &mut Vec<SchemaViolation>, pointer: &str, message: impl Into<String>) {
    out.push(SchemaViolation {
        pointer: pointer.to_string(),
        message: message.into(),
    });
}

fn validate_at(schema: &Value, instance: &Value, pointer: &str, out: &mut Vec<SchemaViolation>) {
    let obj = match schema {
        Value::Bool(true) => return,
        Value::Bool(false) => {
            violation(out, pointer, "no value is allowed here");
            return;
        }
        Value::Object(obj) => obj,
        _ => return,
    };

    if let Some(ty) = obj.get("type") {
        if !type_matches(ty, instance) {
            violation(
                out,
                pointer,
                format!("expected {}, found {}", type_label(ty), json_type(instance)),
            );
            // Remaining keywords assume the declared type
            return;
        }
    }

    if let Some(Value::Array(allowed)) = obj.get("enum") {
        if !allowed.contains(instance) {
            violation(out, pointer, format!("{instance} is not one of the allowed values"));
        }
    }

    if let Some(expected) = obj.get("const") {
        if expected != instance {
            violation(out, pointer, format!("expected constant {expected}"));
        }
    }

    match instance {
        Value::String(s) => validate_string(obj, s, pointer, out),
        Value::Number(_) => validate_number(obj, instance, pointer, out),
        Value::Array(items) => validate_array(obj, items, pointer, out),
        Value::Object(map) => validate_object(obj, map, pointer, out),
        _ => {}
    }

    validate_combinators(obj, instance, pointer, out);
}

fn validate_string(
    schema: &Map<String, Value>,
    s: &str,
    pointer: &str,
    out: &mut Vec<SchemaViolation>,
) {
    let len = s.chars().count() as u64;
    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if len < min {
            violation(out, pointer, format!("shorter than {min} characters"));
        }
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        if len > max {
            violation(out, pointer, format!("longer than {max} characters"));
        }
    }
    if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
        if let Ok(re) = Regex::new(pattern) {
            if !re.is_match(s) {
                violation(out, pointer, format!("does not match pattern '{pattern}'"));
            }
        }
    }
}

fn validate_number(
    schema: &Map<String, Value>,
    instance: &Value,
    pointer: &str,
    out: &mut Vec<SchemaViolation>,
) {
    let Some(n) = instance.as_f64() else {
        return;
    };
    let bound = |key: &str| schema.get(key).and_then(Value::as_f64);
    if let Some(min) = bound("minimum") {
        if n < min {
            violation(out, pointer, format!("less than minimum {min}"));
        }
    }
    if let Some(max) = bound("maximum") {
        if n > max {
            violation(out, pointer, format!("greater than maximum {max}"));
        }
    }
    if let Some(min) = bound("exclusiveMinimum") {
        if n <= min {
            violation(out, pointer, format!("not greater than {min}"));
        }
    }
    if let Some(max) = bound("exclusiveMaximum") {
        if n >= max {
            violation(out, pointer, format!("not less than {max}"));
        }
    }
}

fn validate_array(
    schema: &Map<String, Value>,
    items: &[Value],
    pointer: &str,
    out: &mut Vec<SchemaViolation>,
) {
    let len = items.len() as u64;
    if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
        if len < min {
            violation(out, pointer, format!("fewer than {min} items"));
        }
    }
    if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
        if len > max {
            violation(out, pointer, format!("more than {max} items"));
        }
    }
    if let Some(item_schema) = schema.get("items") {
        for (i, item) in items.iter().enumerate() {
            validate_at(item_schema, item, &child(pointer, &i.to_string()), out);
        }
    }
}

fn validate_object(
    schema: &Map<String, Value>,
    map: &Map<String, Value>,
    pointer: &str,
    out: &mut Vec<SchemaViolation>,
) {
    if let Some(Value::Array(required)) = schema.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !map.contains_key(name) {
                violation(out, pointer, format!("missing required property '{name}'"));
            }
        }
    }

    let props = schema.get("properties").and_then(Value::as_object);
    if let Some(props) = props {
        for (name, sub) in props {
            if let Some(value) = map.get(name) {
                validate_at(sub, value, &child(pointer, name), out);
            }
        }
    }

    if let Some(additional) = schema.get("additionalProperties") {
        for (name, value) in map {
            if props.is_some_and(|p| p.contains_key(name)) {
                continue;
            }
            if additional == &Value::Bool(false) {
                violation(out, pointer, format!("unexpected property '{name}'"));
            } else {
                validate_at(additional, value, &child(pointer, name), out);
            }
        }
    }
}

fn validate_combinators(
    schema: &Map<String, Value>,
    instance: &Value,
    pointer: &str,
    out: &mut Vec<SchemaViolation>,
) {
    if let Some(Value::Array(all)) = schema.get("allOf") {
        for sub in all {
            validate_at(sub, instance, pointer, out);
        }
    }

    if let Some(Value::Array(any)) = schema.get("anyOf") {
        if !any.iter().any(|sub| passes(sub, instance)) {
            violation(out, pointer, "does not match any of the allowed schemas");
        }
    }

    if let Some(Value::Array(one)) = schema.get("oneOf") {
        let matched = one.iter().filter(|sub| passes(sub, instance)).count();
        if matched != 1 {
            violation(
                out,
                pointer,
                format!("matches {matched} schemas in oneOf, expected exactly 1"),
            );
        }
    }

    if let Some(not) = schema.get("not") {
        if passes(not, instance) {
            violation(out, pointer, "matches a schema it must not match");
        }
    }
}

fn passes(schema: &Value, instance: &Value) -> bool {
    let mut scratch = Vec::new();
    validate_at(schema, instance, "", &mut scratch);
    scratch.is_empty()
}

fn type_matches(ty: &Value, instance: &Value) -> bool {
    match ty {
        Value::String(name) => is_type(name, instance),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| is_type(name, instance)),
        _ => true,
    }
}

fn is_type(name: &str, instance: &Value) -> bool {
    match name {
        "null" => instance.is_null(),
        "boolean" => instance.is_boolean(),
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "integer" => match instance {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        _ => false,
    }
}

fn type_label(ty: &Value) -> String {
    match ty {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
