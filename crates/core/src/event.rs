// Event domain types
//
// An event is one business occurrence (a sale, a sign-up, ...) filed under
// a category. Fields form a flat mapping of primitives. Events are immutable
// once created except for the delivery status transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// A primitive event field value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl FieldValue {
    /// Convert a JSON value, rejecting null, arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => Some(FieldValue::Number(n.clone())),
            Value::String(s) => Some(FieldValue::String(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

/// Flat mapping of field name to primitive value.
pub type EventFields = BTreeMap<String, FieldValue>;

/// Notification delivery status.
/// - `pending`: event stored, notification not yet attempted
/// - `delivered`: notification accepted by the delivery channel
/// - `failed`: delivery was attempted and failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Delivered => write!(f, "delivered"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

impl From<&str> for DeliveryStatus {
    fn from(s: &str) -> Self {
        match s {
            "delivered" => DeliveryStatus::Delivered,
            "failed" => DeliveryStatus::Failed,
            _ => DeliveryStatus::Pending,
        }
    }
}

/// Event - one ingested business occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Event {
    /// Unique identifier for the event (UUID v7).
    pub id: Uuid,
    /// ID of the owning account.
    pub account_id: Uuid,
    /// ID of the category the event is filed under.
    pub category_id: Uuid,
    /// Name of the category at ingestion time.
    pub category: String,
    /// Event fields.
    #[cfg_attr(feature = "openapi", schema(value_type = Object, example = json!({"plan": "PRO", "amount": 49.0})))]
    pub fields: EventFields,
    /// Free-text description supplied by the sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rendered notification text.
    pub formatted_message: String,
    /// Delivery status of the notification.
    pub delivery_status: DeliveryStatus,
    /// Server-assigned ingestion timestamp.
    pub created_at: DateTime<Utc>,
}

/// Render the notification text for an event.
pub fn format_message(category: &str, description: Option<&str>) -> String {
    match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(desc) => desc.to_string(),
        None => format!("A new {} event has occurred!", category),
    }
}
