//! JSON-RPC 2.0 framing for MCP over streamable HTTP.
//!
//! A server may answer a POST either with a plain `application/json` body or
//! with a `text/event-stream` body whose `data:` lines carry JSON-RPC
//! messages. Both are reduced to a single response object here.

use scout_core::error::DiscoveryError;
use serde_json::{Value, json};

pub const JSONRPC_VERSION: &str = "2.0";

/// Build a request envelope.
pub fn request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Build a notification envelope (no id, no response expected).
pub fn notification(method: &str) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
    })
}

/// Find the response for `id` in an HTTP body.
pub fn parse_body(body: &str, is_event_stream: bool, id: u64) -> Result<Value, DiscoveryError> {
    let message = if is_event_stream {
        find_event(body, id).ok_or_else(|| {
            DiscoveryError::Protocol(format!("no event-stream message with id {id}"))
        })?
    } else {
        serde_json::from_str::<Value>(body)
            .map_err(|e| DiscoveryError::Protocol(format!("invalid JSON body: {e}")))?
    };

    into_result(message, id)
}

/// First event whose data is a JSON-RPC message with a matching id.
fn find_event(body: &str, id: u64) -> Option<Value> {
    events(body)
        .into_iter()
        .filter_map(|data| serde_json::from_str::<Value>(&data).ok())
        .find(|message| message.get("id").and_then(Value::as_u64) == Some(id))
}

/// Split an event-stream body into the data payload of each event.
///
/// Events end at a blank line; the `data:` lines of one event are joined
/// with `\n`. Comments and other fields are skipped.
fn events(body: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut data: Option<String> = None;

    for line in body.lines().map(|l| l.strip_suffix('\r').unwrap_or(l)) {
        if line.is_empty() {
            events.extend(data.take());
            continue;
        }
        let Some(value) = line.strip_prefix("data") else {
            continue;
        };
        let value = match value.strip_prefix(':') {
            Some(v) => v.strip_prefix(' ').unwrap_or(v),
            None if value.is_empty() => "",
            None => continue,
        };
        match &mut data {
            Some(buffer) => {
                buffer.push('\n');
                buffer.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }
    events.extend(data);

    events
}

/// Unwrap `result`, or turn `error` into [`DiscoveryError::Rpc`].
fn into_result(mut message: Value, id: u64) -> Result<Value, DiscoveryError> {
    if let Some(error) = message.get("error") {
        return Err(DiscoveryError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(-32603),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    match message.get("id").and_then(Value::as_u64) {
        Some(got) if got == id => {}
        other => {
            return Err(DiscoveryError::Protocol(format!(
                "response id {other:?} does not match request id {id}"
            )));
        }
    }

    message
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| DiscoveryError::Protocol("response has neither result nor error".into()))
}
