// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[yare::parameterized(
    bare_object  = { r#"{"a":1}"#, json!({ "a": 1 }) },
    bare_array   = { "[1, 2]", json!([1, 2]) },
    prose_around = { "Here you go: {\"ok\": true} hope that helps", json!({ "ok": true }) },
    fenced       = { "```json\n{\n  \"n\": [1, {\"m\": 2}]\n}\n```", json!({ "n": [1, { "m": 2 }] }) },
    skips_broken = { "{not json} then {\"x\": \"y\"}", json!({ "x": "y" }) },
    nested_first = { "[{\"a\":1}] and {\"b\":2}", json!([{ "a": 1 }]) },
)]
fn extracts(text: &str, expected: Value) {
    assert_eq!(extract_first_json(text), Some(expected));
}

#[yare::parameterized(
    empty      = { "" },
    prose_only = { "no json here" },
    unclosed   = { "{\"a\": 1" },
)]
fn nothing_to_extract(text: &str) {
    assert_eq!(extract_first_json(text), None);
}

#[test]
fn braces_inside_strings_do_not_confuse() {
    let text = r#"result: {"msg": "use {braces} and [brackets]"}"#;
    assert_eq!(
        extract_first_json(text),
        Some(json!({ "msg": "use {braces} and [brackets]" }))
    );
}

#[test]
fn decode_plain_utf8() {
    assert_eq!(decode_output("héllo".as_bytes()), "héllo");
}

#[test]
fn decode_utf8_bom() {
    let mut raw = vec![0xEF, 0xBB, 0xBF];
    raw.extend_from_slice(b"{}");
    assert_eq!(decode_output(&raw), "{}");
}

#[yare::parameterized(
    little_endian = { true },
    big_endian    = { false },
)]
fn decode_utf16_bom(little: bool) {
    let text = "{\"k\":\"ü\"}";
    let mut raw = if little { vec![0xFF, 0xFE] } else { vec![0xFE, 0xFF] };
    for unit in text.encode_utf16() {
        let bytes = if little {
            unit.to_le_bytes()
        } else {
            unit.to_be_bytes()
        };
        raw.extend_from_slice(&bytes);
    }
    assert_eq!(decode_output(&raw), text);
    assert_eq!(extract_first_json(&decode_output(&raw)), Some(json!({ "k": "ü" })));
}

#[test]
fn invalid_utf8_is_replaced() {
    let raw = [b'{', b'}', 0xC3];
    assert!(decode_output(&raw).starts_with("{}"));
}
