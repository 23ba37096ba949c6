//! Input validation and sanitisation.
//!
//! Pure functions: no I/O, no logging. The orchestrator decides how a
//! rejection is reported.

use scout_core::error::InputError;
use scout_core::search::SearchRequest;
use serde_json::Value;

/// Longest accepted query, in characters, measured before sanitising.
pub const MAX_QUERY_CHARS: usize = 1000;

/// Longest accepted user identifier, in characters, after trimming.
pub const MAX_USER_ID_CHARS: usize = 255;

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub query: String,
    pub user_id: Option<String>,
}

/// Validate a search request.
pub fn validate(request: &SearchRequest) -> Result<ValidatedRequest, InputError> {
    validate_parts(&request.query, request.user_id.as_deref())
}

/// Validate a raw query and optional user id.
pub fn validate_parts(query: &str, user_id: Option<&str>) -> Result<ValidatedRequest, InputError> {
    let query = validate_query(query)?;
    let user_id = user_id.map(validate_user_id).transpose()?;
    Ok(ValidatedRequest { query, user_id })
}

/// Remove control characters other than tab, newline and carriage return.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| (c as u32) >= 32 || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

fn validate_query(raw: &str) -> Result<String, InputError> {
    let length = raw.chars().count();
    if length > MAX_QUERY_CHARS {
        return Err(InputError::InvalidQuery(format!(
            "query is {length} characters, limit is {MAX_QUERY_CHARS}"
        )));
    }

    let query = sanitize(raw).trim().to_string();
    if query.is_empty() {
        return Err(InputError::InvalidQuery("query is empty".into()));
    }
    Ok(query)
}

fn validate_user_id(raw: &str) -> Result<String, InputError> {
    let user_id = raw.trim();
    if user_id.is_empty() {
        return Err(InputError::InvalidUserId("user_id is empty".into()));
    }
    if user_id.chars().count() > MAX_USER_ID_CHARS {
        return Err(InputError::InvalidUserId(format!(
            "user_id exceeds {MAX_USER_ID_CHARS} characters"
        )));
    }
    if let Some(bad) = user_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(InputError::InvalidUserId(format!(
            "user_id contains {bad:?}"
        )));
    }
    Ok(user_id.to_string())
}

/// Decode an invocation payload into a [`SearchRequest`].
///
/// `search_query` must be a string. `user_id` may be a string, `null`, or
/// absent; any other type is a field-level error.
pub fn parse_payload(payload: &Value) -> Result<SearchRequest, InputError> {
    let Some(object) = payload.as_object() else {
        return Err(InputError::MalformedPayload(
            "payload is not a JSON object".into(),
        ));
    };

    let query = match object.get("search_query") {
        Some(Value::String(q)) => q.clone(),
        Some(_) => {
            return Err(InputError::InvalidQuery(
                "search_query is not a string".into(),
            ));
        }
        None => return Err(InputError::InvalidQuery("search_query is missing".into())),
    };

    let user_id = match object.get("user_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(u)) => Some(u.clone()),
        Some(_) => {
            return Err(InputError::InvalidUserId(
                "user_id is not a string".into(),
            ));
        }
    };

    Ok(SearchRequest { query, user_id })
}

/// Decode raw request bytes into a [`SearchRequest`].
pub fn parse_bytes(body: &[u8]) -> Result<SearchRequest, InputError> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| InputError::MalformedPayload(e.to_string()))?;
    parse_payload(&payload)
}
