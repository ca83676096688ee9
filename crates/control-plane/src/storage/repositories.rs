// Repository layer for PostgreSQL
// Decision: Runtime-checked queries (query_as) so builds don't need a live database
// Decision: Quota increment and event insert share one transaction

use anyhow::Result;
use pingpanda_core::QuotaPeriod;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::*;

const ACCOUNT_COLUMNS: &str =
    "id, email, api_key_hash, api_key_prefix, discord_id, plan, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, account_id, name, color, emoji, created_at";
const EVENT_COLUMNS: &str = "id, account_id, category_id, category_name, fields, description, formatted_message, delivery_status, created_at";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create database connection with a bounded pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Accounts
    // ============================================

    pub async fn create_account(&self, input: CreateAccountRow) -> Result<AccountRow> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO accounts (id, email, api_key_hash, api_key_prefix, discord_id, plan)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(&input.email)
        .bind(&input.api_key_hash)
        .bind(&input.api_key_prefix)
        .bind(&input.discord_id)
        .bind(&input.plan)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_account(&self, id: Uuid) -> Result<Option<AccountRow>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_account_by_api_key_hash(&self, key_hash: &str) -> Result<Option<AccountRow>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE api_key_hash = $1"
        ))
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ============================================
    // Event categories
    // ============================================

    pub async fn create_event_category(
        &self,
        input: CreateEventCategoryRow,
    ) -> Result<EventCategoryRow> {
        let row = sqlx::query_as::<_, EventCategoryRow>(&format!(
            r#"
            INSERT INTO event_categories (id, account_id, name, color, emoji)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(input.account_id)
        .bind(&input.name)
        .bind(input.color)
        .bind(&input.emoji)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_event_category_by_name(
        &self,
        account_id: Uuid,
        name: &str,
    ) -> Result<Option<EventCategoryRow>> {
        let row = sqlx::query_as::<_, EventCategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM event_categories WHERE account_id = $1 AND name = $2"
        ))
        .bind(account_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ============================================
    // Events and quotas
    // ============================================

    /// Reserve a quota slot and insert the event atomically.
    ///
    /// The conditional upsert only bumps the counter while it is below
    /// `limit`; concurrent callers serialize on the quota row, so at most
    /// `limit` events are ever counted for a period.
    pub async fn create_event_within_quota(
        &self,
        input: CreateEventRow,
        limit: i32,
    ) -> Result<QuotaInsert> {
        let period = QuotaPeriod::containing(input.created_at);
        let mut tx = self.pool.begin().await?;

        let used = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO quotas (account_id, year, month, count)
            SELECT $1, $2, $3, 1
            WHERE $4 > 0
            ON CONFLICT (account_id, year, month)
            DO UPDATE SET count = quotas.count + 1, updated_at = NOW()
            WHERE quotas.count < $4
            RETURNING count
            "#,
        )
        .bind(input.account_id)
        .bind(period.year)
        .bind(period.month as i32)
        .bind(limit)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(used) = used else {
            tx.rollback().await?;
            return Ok(QuotaInsert::Exceeded);
        };

        let event = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (id, account_id, category_id, category_name, fields, description, formatted_message, delivery_status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $8)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(input.account_id)
        .bind(input.category_id)
        .bind(&input.category_name)
        .bind(&input.fields)
        .bind(&input.description)
        .bind(&input.formatted_message)
        .bind(input.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(QuotaInsert::Created { event, used })
    }

    pub async fn get_event(&self, id: Uuid) -> Result<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn count_events_for_account(&self, account_id: Uuid) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE account_id = $1")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    pub async fn update_event_delivery_status(&self, id: Uuid, status: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET delivery_status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_quota_count(&self, account_id: Uuid, period: QuotaPeriod) -> Result<i32> {
        let count = sqlx::query_scalar::<_, i32>(
            "SELECT count FROM quotas WHERE account_id = $1 AND year = $2 AND month = $3",
        )
        .bind(account_id)
        .bind(period.year)
        .bind(period.month as i32)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.unwrap_or(0))
    }
}
