//! Small JSON coercion helpers.
//!
//! Params and state values are untyped [`serde_json::Value`]s; config front
//! ends are loose about numeric types, so these helpers accept the common
//! encodings (an integer arriving as a float, a bool arriving as a string).

use serde_json::Value;

/// Coerces an integer-ish value. Accepts JSON integers and whole floats.
#[must_use]
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        _ => None,
    }
}

/// Coerces a float-ish value.
#[must_use]
pub fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Coerces a bool-ish value. Accepts JSON booleans and the strings
/// `"true"` / `"false"` (case-insensitive).
#[must_use]
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Borrows a string value.
#[must_use]
pub fn as_str(value: &Value) -> Option<&str> {
    value.as_str()
}
