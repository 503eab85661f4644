//! Response envelope handling.
//!
//! Most endpoints wrap their payload as `{"success": bool, "message": str,
//! "data": ...}`, but a few older ones answer with the payload directly.
//! `unwrap_envelope` accepts both: a body is treated as wrapped only when it
//! carries *both* marker fields, otherwise it passes through unchanged.

use std::collections::HashMap;

use serde_json::Value;

/// Peel the `{success, message, data}` wrapper off a response body, or
/// return the body unchanged when it is not wrapped.
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("success") && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Error details carried by a failure envelope.
#[derive(Debug, Default)]
pub struct FailureBody {
    pub message: Option<String>,
    pub errors: HashMap<String, Vec<String>>,
}

/// Extract `message` and the optional field-level `errors` map from an
/// error response body. Tolerates bodies that are not JSON objects and
/// error values that are a single string instead of a list.
pub fn parse_failure(body: &[u8]) -> FailureBody {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return FailureBody::default();
    };
    let Value::Object(map) = value else {
        return FailureBody::default();
    };

    let message = map
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut errors = HashMap::new();
    if let Some(Value::Object(fields)) = map.get("errors") {
        for (field, reasons) in fields {
            let list = match reasons {
                Value::String(reason) => vec![reason.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };
            if !list.is_empty() {
                errors.insert(field.clone(), list);
            }
        }
    }

    FailureBody { message, errors }
}
