// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pulling a JSON document out of free-form agent output

use serde_json::Value;

/// Decode raw output bytes, honouring UTF-8 and UTF-16 byte order marks.
///
/// Invalid sequences are replaced rather than rejected.
pub fn decode_output(raw: &[u8]) -> String {
    match raw {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => String::from_utf8_lossy(raw).into_owned(),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// First JSON object or array embedded in `text`.
///
/// Agents often wrap their answer in prose or a fenced block; every `{` or
/// `[` is tried in order and the first one that starts a complete document
/// wins.
pub fn extract_first_json(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, c)| matches!(c, '{' | '['))
        .find_map(|(start, _)| {
            let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value)) => Some(value),
                _ => None,
            }
        })
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
