// Event category domain types
//
// Categories are named buckets scoped to one account. Names are unique
// per account and restricted to letters, digits and hyphens.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Maximum length of a category name.
pub const MAX_CATEGORY_NAME_LEN: usize = 64;

static CATEGORY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9-]+$").expect("category name pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryNameError {
    #[error("category name is required")]
    Empty,
    #[error("category name must be at most {MAX_CATEGORY_NAME_LEN} characters")]
    TooLong,
    #[error("category name may only contain letters, numbers or hyphens")]
    InvalidCharacters,
}

/// Validate a category name before it is created.
pub fn validate_category_name(name: &str) -> Result<(), CategoryNameError> {
    if name.is_empty() {
        return Err(CategoryNameError::Empty);
    }
    if name.len() > MAX_CATEGORY_NAME_LEN {
        return Err(CategoryNameError::TooLong);
    }
    if !CATEGORY_NAME_RE.is_match(name) {
        return Err(CategoryNameError::InvalidCharacters);
    }
    Ok(())
}

/// EventCategory - a named bucket of events owned by one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct EventCategory {
    /// Unique identifier for the category.
    pub id: Uuid,
    /// ID of the owning account.
    pub account_id: Uuid,
    /// Category name, unique per account.
    #[cfg_attr(feature = "openapi", schema(example = "sale"))]
    pub name: String,
    /// Embed colour as a 24-bit RGB integer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<i32>,
    /// Emoji shown in front of the notification title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// Timestamp when the category was created.
    pub created_at: DateTime<Utc>,
}

impl EventCategory {
    /// Notification title: emoji (or a bell) followed by the capitalized name.
    pub fn notification_title(&self) -> String {
        let emoji = self
            .emoji
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or("🔔");
        let mut chars = self.name.chars();
        let name = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{} {}", emoji, name)
    }
}
