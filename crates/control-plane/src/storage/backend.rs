// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// This module provides a unified StorageBackend enum that can work with
// either PostgreSQL (production) or in-memory (dev mode) storage.

use anyhow::Result;
use pingpanda_core::QuotaPeriod;
use std::sync::Arc;
use uuid::Uuid;

use super::memory::InMemoryDatabase;
use super::models::*;
use super::repositories::Database;

/// Storage backend that can be either PostgreSQL or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(Database),
    /// In-memory database (dev mode)
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Connect to PostgreSQL and apply migrations
    pub async fn postgres(database_url: &str, max_connections: u32) -> Result<Self> {
        let db = Database::connect(database_url, max_connections).await?;
        db.migrate().await?;
        Ok(Self::Postgres(db))
    }

    /// Create an in-memory storage backend
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    /// Check if this is dev mode (in-memory)
    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }

    /// Short backend name for health reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::InMemory(_) => "in-memory",
        }
    }

    // ============================================
    // Accounts
    // ============================================

    pub async fn create_account(&self, input: CreateAccountRow) -> Result<AccountRow> {
        match self {
            Self::Postgres(db) => db.create_account(input).await,
            Self::InMemory(db) => db.create_account(input).await,
        }
    }

    pub async fn get_account(&self, id: Uuid) -> Result<Option<AccountRow>> {
        match self {
            Self::Postgres(db) => db.get_account(id).await,
            Self::InMemory(db) => db.get_account(id).await,
        }
    }

    pub async fn get_account_by_api_key_hash(&self, key_hash: &str) -> Result<Option<AccountRow>> {
        match self {
            Self::Postgres(db) => db.get_account_by_api_key_hash(key_hash).await,
            Self::InMemory(db) => db.get_account_by_api_key_hash(key_hash).await,
        }
    }

    // ============================================
    // Event categories
    // ============================================

    pub async fn create_event_category(
        &self,
        input: CreateEventCategoryRow,
    ) -> Result<EventCategoryRow> {
        match self {
            Self::Postgres(db) => db.create_event_category(input).await,
            Self::InMemory(db) => db.create_event_category(input).await,
        }
    }

    pub async fn get_event_category_by_name(
        &self,
        account_id: Uuid,
        name: &str,
    ) -> Result<Option<EventCategoryRow>> {
        match self {
            Self::Postgres(db) => db.get_event_category_by_name(account_id, name).await,
            Self::InMemory(db) => db.get_event_category_by_name(account_id, name).await,
        }
    }

    // ============================================
    // Events and quotas
    // ============================================

    pub async fn create_event_within_quota(
        &self,
        input: CreateEventRow,
        limit: i32,
    ) -> Result<QuotaInsert> {
        match self {
            Self::Postgres(db) => db.create_event_within_quota(input, limit).await,
            Self::InMemory(db) => db.create_event_within_quota(input, limit).await,
        }
    }

    pub async fn get_event(&self, id: Uuid) -> Result<Option<EventRow>> {
        match self {
            Self::Postgres(db) => db.get_event(id).await,
            Self::InMemory(db) => db.get_event(id).await,
        }
    }

    pub async fn count_events_for_account(&self, account_id: Uuid) -> Result<i64> {
        match self {
            Self::Postgres(db) => db.count_events_for_account(account_id).await,
            Self::InMemory(db) => db.count_events_for_account(account_id).await,
        }
    }

    pub async fn update_event_delivery_status(&self, id: Uuid, status: &str) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.update_event_delivery_status(id, status).await,
            Self::InMemory(db) => db.update_event_delivery_status(id, status).await,
        }
    }

    pub async fn get_quota_count(&self, account_id: Uuid, period: QuotaPeriod) -> Result<i32> {
        match self {
            Self::Postgres(db) => db.get_quota_count(account_id, period).await,
            Self::InMemory(db) => db.get_quota_count(account_id, period).await,
        }
    }
}
