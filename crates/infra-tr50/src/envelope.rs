// TR50 JSON envelopes
// Request bodies and response classification, kept free of I/O

use crate::config::Credentials;
use ambrogio_core::port::RemoteError;
use serde_json::{json, Map, Value};

/// Substring the API uses when a session has expired
pub const SESSION_INVALID_MARKER: &str = "Authentication session is invalid";

const DEFAULT_FAILURE_MESSAGE: &str = "TR50 call failed";

pub(crate) fn auth_request(credentials: &Credentials) -> Value {
    json!({
        "auth": {
            "command": "api.authenticate",
            "params": {
                "appId": credentials.app_id,
                "appToken": credentials.app_token,
                "thingKey": credentials.thing_key,
            }
        }
    })
}

/// `params` are only sent when truthy
pub(crate) fn call_request(session_id: &str, command: &str, params: Value) -> Value {
    let mut data = Map::new();
    data.insert("command".into(), Value::String(command.to_string()));
    if truthy(&params) {
        data.insert("params".into(), params);
    }
    json!({
        "auth": { "sessionId": session_id },
        "data": data,
    })
}

/// Sort a parsed response into success or a typed failure
///
/// A response counts as successful when any of `success`, `data.success`
/// or `auth.success` is truthy.
pub fn classify(response: Value) -> Result<Value, RemoteError> {
    let succeeded = [
        response.get("success"),
        response.pointer("/data/success"),
        response.pointer("/auth/success"),
    ]
    .into_iter()
    .flatten()
    .any(truthy);

    if succeeded {
        return Ok(response);
    }

    let messages: Vec<String> = [
        response.get("errorMessages"),
        response.pointer("/data/errorMessages"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_array)
    .flatten()
    .map(|m| match m {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
    .collect();

    let message = if messages.is_empty() {
        DEFAULT_FAILURE_MESSAGE.to_string()
    } else {
        messages.join("; ")
    };

    if message.contains(SESSION_INVALID_MARKER) {
        Err(RemoteError::SessionInvalid(message))
    } else {
        Err(RemoteError::Api(message))
    }
}

pub(crate) fn session_id(response: &Value) -> Result<String, RemoteError> {
    response
        .pointer("/auth/params/sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            RemoteError::SessionInvalid("Missing sessionId in authentication response".into())
        })
}

/// `data.params` when present and truthy, else the whole response
pub(crate) fn unwrap_params(response: Value) -> Value {
    match response.pointer("/data/params") {
        Some(params) if truthy(params) => params.clone(),
        _ => response,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
