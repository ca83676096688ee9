// Database models (internal, may differ from public DTOs)

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================
// Accounts
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub email: String,
    pub api_key_hash: String,
    pub api_key_prefix: String,
    pub discord_id: Option<String>,
    pub plan: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAccountRow {
    pub email: String,
    pub api_key_hash: String,
    pub api_key_prefix: String,
    pub discord_id: Option<String>,
    pub plan: String,
}

// ============================================
// Event categories
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct EventCategoryRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub color: Option<i32>,
    pub emoji: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateEventCategoryRow {
    pub account_id: Uuid,
    pub name: String,
    pub color: Option<i32>,
    pub emoji: Option<String>,
}

// ============================================
// Events
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub fields: sqlx::types::JsonValue,
    pub description: Option<String>,
    pub formatted_message: String,
    pub delivery_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateEventRow {
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub fields: sqlx::types::JsonValue,
    pub description: Option<String>,
    pub formatted_message: String,
    /// Event timestamp; also selects the quota period that is charged.
    pub created_at: DateTime<Utc>,
}

/// Outcome of inserting an event against the monthly quota.
#[derive(Debug, Clone)]
pub enum QuotaInsert {
    /// Event stored; `used` is the period count after the increment.
    Created { event: EventRow, used: i32 },
    /// Ceiling already reached; nothing was written.
    Exceeded,
}
