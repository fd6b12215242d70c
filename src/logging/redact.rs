//! Structural password redaction
//!
//! Works on the parsed payload tree instead of pattern-matching serialized
//! text, so nested objects, arrays, and bodies that arrive pre-serialized as
//! JSON strings are all covered.

use serde_json::Value;

const MASK: &str = "*****";

/// Mask every value whose key is `password` (case-insensitive), recursively
pub fn redact_passwords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if key.eq_ignore_ascii_case("password") {
                    *entry = Value::String(MASK.to_string());
                } else {
                    redact_passwords(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_passwords(item);
            }
        }
        Value::String(text) => {
            // Request/response bodies are often embedded as JSON strings;
            // re-parse, redact, and re-render those
            if looks_like_json(text) {
                if let Ok(mut inner) = serde_json::from_str::<Value>(text) {
                    if matches!(inner, Value::Object(_) | Value::Array(_)) {
                        redact_passwords(&mut inner);
                        if let Ok(rendered) = serde_json::to_string(&inner) {
                            *text = rendered;
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}
