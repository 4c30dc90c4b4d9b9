//! Response decoding.

use serde_json::{json, Value};

use crate::error::transport::STATUS_CSRF_MISMATCH;
use crate::error::TransportError;
use crate::http::request::Method;
use crate::http::serializer::normalize;
use crate::http::transport::RawResponse;

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|value| {
        let value = value.to_ascii_lowercase();
        value.contains("application/json") || value.contains("+json")
    })
}

/// Decode a 2xx response into a normalized JSON value.
///
/// HEAD yields `Null`, an empty body yields `{}`, JSON content is parsed,
/// anything else comes back as a string.
pub fn parse_success(method: Method, response: &RawResponse) -> Result<Value, TransportError> {
    if method == Method::Head {
        return Ok(Value::Null);
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    let value = if is_json(response.content_type()) {
        serde_json::from_slice(&response.body)
            .map_err(|e| TransportError::malformed_response(format!("Invalid JSON response: {}", e)))?
    } else {
        Value::String(String::from_utf8_lossy(&response.body).into_owned())
    };
    Ok(normalize(value))
}

/// Build the `TransportError` for a non-2xx response.
pub fn error_from_response(response: &RawResponse) -> TransportError {
    let payload = if is_json(response.content_type()) {
        serde_json::from_slice::<Value>(&response.body).ok()
    } else if response.body.is_empty() {
        None
    } else {
        Some(Value::String(String::from_utf8_lossy(&response.body).into_owned()))
    };

    if response.status == STATUS_CSRF_MISMATCH {
        return TransportError::http(STATUS_CSRF_MISMATCH, "CSRF token mismatch", payload);
    }

    let message = payload
        .as_ref()
        .and_then(Value::as_object)
        .and_then(|body| {
            ["error", "message"]
                .iter()
                .find_map(|key| body.get(*key).and_then(Value::as_str))
        })
        .filter(|message| !message.trim().is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("Request failed with status {}", response.status));

    TransportError::http(response.status, message, payload)
}
