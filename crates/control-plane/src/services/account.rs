// Provisioning service for accounts and categories
// Accounts and categories are created out-of-band (operator CLI, dev seed)

use anyhow::{bail, Context, Result};
use pingpanda_core::{validate_category_name, Account, EventCategory, Plan};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::api_key::{generate_api_key, GeneratedApiKey};
use crate::auth::middleware::row_to_account;
use crate::storage::{CreateAccountRow, CreateEventCategoryRow, EventCategoryRow, StorageBackend};

pub struct ProvisioningService {
    db: Arc<StorageBackend>,
}

impl ProvisioningService {
    pub fn new(db: Arc<StorageBackend>) -> Self {
        Self { db }
    }

    /// Create an account with a freshly generated API key.
    /// The returned key is the only copy of the plaintext.
    pub async fn create_account(
        &self,
        email: &str,
        discord_id: Option<String>,
        plan: Plan,
    ) -> Result<(Account, GeneratedApiKey)> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            bail!("invalid email address: {:?}", email);
        }

        let discord_id = discord_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let key = generate_api_key();
        let row = self
            .db
            .create_account(CreateAccountRow {
                email: email.to_string(),
                api_key_hash: key.key_hash.clone(),
                api_key_prefix: key.key_prefix.clone(),
                discord_id,
                plan: plan.to_string(),
            })
            .await
            .context("Failed to create account")?;

        tracing::info!(account_id = %row.id, plan = %plan, "Account created");
        Ok((row_to_account(row), key))
    }

    pub async fn create_category(
        &self,
        account_id: Uuid,
        name: &str,
        color: Option<i32>,
        emoji: Option<String>,
    ) -> Result<EventCategory> {
        validate_category_name(name)?;

        if let Some(color) = color {
            if !(0..=0xFF_FFFF).contains(&color) {
                bail!("color must be a 24-bit RGB value");
            }
        }

        if self.db.get_account(account_id).await?.is_none() {
            bail!("account {} not found", account_id);
        }

        let row = self
            .db
            .create_event_category(CreateEventCategoryRow {
                account_id,
                name: name.to_string(),
                color,
                emoji: emoji.filter(|e| !e.is_empty()),
            })
            .await
            .context("Failed to create category")?;

        tracing::info!(account_id = %account_id, category = %row.name, "Category created");
        Ok(row_to_category(row))
    }
}

pub(crate) fn row_to_category(row: EventCategoryRow) -> EventCategory {
    EventCategory {
        id: row.id,
        account_id: row.account_id,
        name: row.name,
        color: row.color,
        emoji: row.emoji,
        created_at: row.created_at,
    }
}

/// Parse a colour given as hex (`#00ff00`, `0x00ff00` or `00ff00`).
pub fn parse_hex_color(value: &str) -> Result<i32> {
    let digits = value
        .trim()
        .trim_start_matches('#')
        .trim_start_matches("0x");
    if digits.is_empty() || digits.len() > 6 {
        bail!("color must be 1-6 hex digits, got {:?}", value);
    }
    i32::from_str_radix(digits, 16).with_context(|| format!("invalid hex color {:?}", value))
}
