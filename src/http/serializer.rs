//! Payload normalization and body encoding.
//!
//! # Responsibilities
//! - Normalize JSON values before sending and after receiving
//! - Encode request bodies according to their content kind
//! - Encode/decode nested form bodies in bracket notation (`a[b]=c`, `a[]=x`)
//!
//! # Design Decisions
//! - `normalize` is idempotent: numbers stay numbers, coerced strings become
//!   numbers once and are never touched again
//! - Only canonical decimal literals are coerced, so values like "0012"
//!   (SKUs, phone numbers) keep their string form

use bytes::Bytes;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::sync::OnceLock;

use crate::error::TransportError;
use crate::http::request::Body;

fn numeric_literal() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?$").expect("numeric literal pattern is valid"))
}

fn coerce_numeric(text: &str) -> Option<Value> {
    if !numeric_literal().is_match(text) {
        return None;
    }
    if text.contains('.') {
        text.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
    } else {
        text.parse::<i64>().ok().map(Value::from)
    }
}

/// Recursively normalize a JSON value (numeric strings become numbers).
pub fn normalize(value: Value) -> Value {
    match value {
        Value::String(text) => coerce_numeric(&text).unwrap_or(Value::String(text)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, normalize(value)))
                .collect(),
        ),
        other => other,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some("0".to_string()),
        _ => None,
    }
}

fn flatten(prefix: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(fields) => {
            for (key, value) in fields {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}[{}]", prefix, key)
                };
                flatten(&name, value, pairs);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                match scalar_text(item) {
                    Some(text) => pairs.push((format!("{}[]", prefix), text)),
                    None => flatten(&format!("{}[{}]", prefix, index), item, pairs),
                }
            }
        }
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                pairs.push((prefix.to_string(), text));
            }
        }
    }
}

/// Encode a JSON object as `application/x-www-form-urlencoded`.
///
/// Nulls are skipped and booleans are sent as `1`/`0`. Arrays of scalars use
/// `key[]`; arrays holding objects use explicit indexes (`key[0][field]`).
pub fn encode_form(value: &Value) -> Result<String, TransportError> {
    if !value.is_object() {
        return Err(TransportError::invalid_request("Form body must be an object"));
    }
    let mut pairs = Vec::new();
    flatten("", value, &mut pairs);
    serde_urlencoded::to_string(&pairs)
        .map_err(|e| TransportError::invalid_request(format!("Failed to encode form body: {}", e)))
}

fn key_segments(key: &str) -> Vec<String> {
    let (head, rest) = match key.find('[') {
        Some(index) if key.ends_with(']') => (&key[..index], &key[index..]),
        _ => return vec![key.to_string()],
    };
    let mut segments = vec![head.to_string()];
    segments.extend(
        rest.trim_start_matches('[')
            .trim_end_matches(']')
            .split("][")
            .map(str::to_owned),
    );
    segments
}

fn insert(target: &mut Value, segments: &[String], value: String) {
    let Some((head, rest)) = segments.split_first() else {
        *target = Value::String(value);
        return;
    };
    if head.is_empty() {
        if !target.is_array() {
            *target = Value::Array(Vec::new());
        }
        if let Value::Array(items) = target {
            let mut slot = Value::Null;
            insert(&mut slot, rest, value);
            items.push(slot);
        }
        return;
    }
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(fields) = target {
        let slot = fields.entry(head.clone()).or_insert(Value::Null);
        insert(slot, rest, value);
    }
}

/// Turn objects keyed exactly `"0"..n` back into arrays, depth first.
fn restore_indexed_arrays(value: Value) -> Value {
    match value {
        Value::Object(fields) => {
            let indexed = !fields.is_empty()
                && fields
                    .keys()
                    .enumerate()
                    .all(|(position, key)| key.parse::<usize>().ok() == Some(position));
            if indexed {
                Value::Array(fields.into_iter().map(|(_, item)| restore_indexed_arrays(item)).collect())
            } else {
                Value::Object(
                    fields
                        .into_iter()
                        .map(|(key, item)| (key, restore_indexed_arrays(item)))
                        .collect(),
                )
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(restore_indexed_arrays).collect()),
        other => other,
    }
}

/// Decode a form body produced by `encode_form` back into nested JSON.
///
/// Leaf values stay strings; run `normalize` to recover numbers. Indexed
/// entries (`key[0][field]`) come back as arrays. Booleans are not
/// recoverable: they travel as `1`/`0` and decode as those numbers.
pub fn decode_form(encoded: &str) -> Result<Value, TransportError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(encoded)
        .map_err(|e| TransportError::malformed_response(format!("Invalid form body: {}", e)))?;
    let mut root = Value::Object(Map::new());
    for (key, value) in pairs {
        insert(&mut root, &key_segments(&key), value);
    }
    Ok(restore_indexed_arrays(root))
}

/// Serialize a request body according to its content kind.
pub fn serialize_body(body: &Body) -> Result<Bytes, TransportError> {
    match body {
        Body::Json(value) => serde_json::to_vec(&normalize(value.clone()))
            .map(Bytes::from)
            .map_err(|e| TransportError::invalid_request(format!("Failed to encode JSON body: {}", e))),
        Body::Form(value) => encode_form(&normalize(value.clone())).map(Bytes::from),
        Body::Text(text) => Ok(Bytes::from(text.clone())),
        Body::Blob(bytes) | Body::ByteBuffer(bytes) => Ok(bytes.clone()),
    }
}
