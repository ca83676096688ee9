// Request body validation for event ingestion
//
// Parsing happens in two stages so malformed JSON (400) is told apart from
// well-formed JSON with the wrong shape (422). Size limits follow what a
// Discord embed can carry.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use pingpanda_core::{EventFields, FieldValue};
use serde_json::Value;

use super::errors::ApiError;

// =============================================================================
// Input Size Limits
// =============================================================================

/// Maximum size of a raw request body. Any valid event fits well below this.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// Maximum size for the category name.
pub const MAX_CATEGORY_BYTES: usize = 64;

/// Maximum number of fields per event. Discord embeds hold at most 25 fields.
pub const MAX_FIELDS: usize = 25;

/// Maximum size for a field name. Matches the Discord embed field name limit.
pub const MAX_FIELD_NAME_BYTES: usize = 256;

/// Maximum size for a string field value. Matches the Discord embed field value limit.
pub const MAX_FIELD_VALUE_BYTES: usize = 1024;

/// Maximum size for the optional description.
pub const MAX_DESCRIPTION_BYTES: usize = 4096;

/// Validated ingestion payload
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub category: String,
    pub fields: EventFields,
    pub description: Option<String>,
}

/// Map a failed body read onto the error taxonomy: 422 when the body is over
/// [`MAX_BODY_BYTES`], 400 for anything else.
pub fn body_from_extractor(body: Result<Bytes, BytesRejection>) -> Result<Bytes, ApiError> {
    body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Failed to read request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            unprocessable(format!(
                "request body exceeds {} bytes",
                MAX_BODY_BYTES
            ))
        } else {
            ApiError::BadRequest("Failed to read request body".to_string())
        }
    })
}

/// Parse the raw body into JSON, failing with 400 when it is not JSON.
pub fn parse_json_body(body: &[u8]) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body that is not valid JSON");
        ApiError::BadRequest("Invalid JSON request body".to_string())
    })
}

/// Check the JSON shape, failing with 422 on any violation.
pub fn validate_event_payload(value: Value) -> Result<EventPayload, ApiError> {
    let Value::Object(mut body) = value else {
        return Err(unprocessable("request body must be a JSON object"));
    };

    let category = match body.remove("category") {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::String(_)) => return Err(unprocessable("category must not be empty")),
        Some(_) => return Err(unprocessable("category must be a string")),
        None => return Err(unprocessable("category is required")),
    };
    if category.len() > MAX_CATEGORY_BYTES {
        return Err(unprocessable("category exceeds allowed length"));
    }

    let fields = match body.remove("fields") {
        None => EventFields::new(),
        Some(Value::Object(map)) => validate_fields(map)?,
        Some(_) => return Err(unprocessable("fields must be an object")),
    };

    let description = match body.remove("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.len() <= MAX_DESCRIPTION_BYTES => Some(s),
        Some(Value::String(_)) => {
            return Err(unprocessable("description exceeds allowed length"))
        }
        Some(_) => return Err(unprocessable("description must be a string")),
    };

    Ok(EventPayload {
        category,
        fields,
        description,
    })
}

fn validate_fields(map: serde_json::Map<String, Value>) -> Result<EventFields, ApiError> {
    if map.len() > MAX_FIELDS {
        return Err(unprocessable(format!(
            "fields may contain at most {} entries",
            MAX_FIELDS
        )));
    }

    let mut fields = EventFields::new();
    for (name, value) in map {
        if name.is_empty() || name.len() > MAX_FIELD_NAME_BYTES {
            return Err(unprocessable("field names must be 1-256 bytes"));
        }
        let Some(field) = FieldValue::from_json(&value) else {
            return Err(unprocessable(format!(
                "fields.{} must be a string, number or boolean",
                name
            )));
        };
        if let FieldValue::String(s) = &field {
            if s.len() > MAX_FIELD_VALUE_BYTES {
                return Err(unprocessable(format!(
                    "fields.{} exceeds allowed length",
                    name
                )));
            }
        }
        fields.insert(name, field);
    }
    Ok(fields)
}

fn unprocessable(message: impl Into<String>) -> ApiError {
    ApiError::UnprocessableEntity(message.into())
}
