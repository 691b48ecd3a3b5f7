// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn with_scope<T>(f: impl FnOnce(&Scope<'_>) -> T) -> T {
    let input = json!({ "project": { "name": "atlas", "tags": ["a", "b"] }, "count": 3 });
    let research = json!({ "summary": "found 2 issues", "issues": [{ "id": 7 }] });
    let skipped = Value::Null;
    let mut steps = HashMap::new();
    steps.insert("research", &research);
    steps.insert("lint", &skipped);
    let scope = Scope {
        run_id: "run-1",
        process_id: "review",
        input: &input,
        steps: &steps,
    };
    f(&scope)
}

#[yare::parameterized(
    whole_input     = { "input", Reference::Input(vec![]) },
    input_path      = { "input.project.name", Reference::Input(vec!["project".into(), "name".into()]) },
    step_whole      = { "steps.research", Reference::Step { step: StepId::new("research"), path: vec![] } },
    step_path       = { "steps.research.summary", Reference::Step { step: StepId::new("research"), path: vec!["summary".into()] } },
    run_id          = { "run.id", Reference::RunId },
    run_process     = { " run.process ", Reference::ProcessId },
)]
fn parse_references(text: &str, expected: Reference) {
    assert_eq!(Reference::parse(text).unwrap(), expected);
}

#[yare::parameterized(
    empty           = { "" },
    unknown_ns      = { "env.HOME" },
    no_step_id      = { "steps" },
    bad_run_field   = { "run.owner" },
    empty_segment   = { "input..name" },
)]
fn parse_rejects(text: &str) {
    assert!(matches!(
        Reference::parse(text),
        Err(MappingError::Invalid { .. })
    ));
}

#[test]
fn whole_string_reference_keeps_type() {
    let mapping = InputMapping::new(json!({
        "count": "${input.count}",
        "tags": "${input.project.tags}",
        "prior": "${steps.research}"
    }));
    let value = with_scope(|scope| mapping.resolve(scope)).unwrap();
    assert_eq!(value["count"], json!(3));
    assert_eq!(value["tags"], json!(["a", "b"]));
    assert_eq!(value["prior"]["summary"], "found 2 issues");
}

#[test]
fn embedded_reference_is_interpolated() {
    let mapping = InputMapping::new(json!(
        "Review ${input.project.name} (${input.count} files) for ${run.process}/${run.id}"
    ));
    let value = with_scope(|scope| mapping.resolve(scope)).unwrap();
    assert_eq!(value, json!("Review atlas (3 files) for review/run-1"));
}

#[test]
fn array_index_segments() {
    let mapping = InputMapping::new(json!("${steps.research.issues.0.id}"));
    let value = with_scope(|scope| mapping.resolve(scope)).unwrap();
    assert_eq!(value, json!(7));
}

#[test]
fn default_mapping_passes_input_through() {
    let value = with_scope(|scope| InputMapping::default().resolve(scope)).unwrap();
    assert_eq!(value["project"]["name"], "atlas");
}

#[test]
fn skipped_step_reads_as_null() {
    let mapping = InputMapping::new(json!({ "lint": "${steps.lint.findings}", "note": "lint: ${steps.lint}" }));
    let value = with_scope(|scope| mapping.resolve(scope)).unwrap();
    assert_eq!(value, json!({ "lint": null, "note": "lint: " }));
}

#[yare::parameterized(
    missing_field   = { "${input.project.owner}" },
    missing_step    = { "${steps.draft.text}" },
    bad_index       = { "${input.project.tags.9}" },
    through_scalar  = { "${input.count.value}" },
)]
fn unresolved_references_fail(template: &str) {
    let mapping = InputMapping::new(json!(template));
    let err = with_scope(|scope| mapping.resolve(scope)).unwrap_err();
    assert!(matches!(err, MappingError::Missing { .. }), "{err}");
}

#[test]
fn references_in_document_order() {
    let mapping = InputMapping::new(json!({
        "a": ["${steps.one.x}", { "b": "${input}" }],
        "c": "prefix ${steps.two} and ${run.id}",
        "d": 5
    }));
    let refs = mapping.references().unwrap();
    let steps: Vec<_> = refs.iter().filter_map(Reference::step).map(StepId::as_str).collect();
    assert_eq!(steps, vec!["one", "two"]);
    assert_eq!(refs.len(), 4);
}

#[test]
fn missing_error_names_reference() {
    let err = MappingError::Missing {
        reference: "input.x".to_string(),
    };
    assert_eq!(err.to_string(), "reference ${input.x} did not resolve to a value");
}
