// In-memory storage implementation for dev mode and tests
// Decision: Use parking_lot for thread-safe access
// Decision: UUIDs generated via uuid v7 (time-ordered)
//
// This implementation mirrors the PostgreSQL repository API backed by
// HashMaps, so the server can run without a database.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use pingpanda_core::QuotaPeriod;
use std::collections::HashMap;
use uuid::Uuid;

use super::models::*;

/// Events and quota counters change together, so they share one lock
#[derive(Default)]
struct EventLedger {
    events: HashMap<Uuid, EventRow>,
    quotas: HashMap<(Uuid, QuotaPeriod), i32>,
}

/// In-memory database
/// All data is stored in memory and lost on restart
#[derive(Default)]
pub struct InMemoryDatabase {
    accounts: RwLock<HashMap<Uuid, AccountRow>>,
    categories: RwLock<HashMap<Uuid, EventCategoryRow>>,
    ledger: Mutex<EventLedger>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    // ============================================
    // Accounts
    // ============================================

    pub async fn create_account(&self, input: CreateAccountRow) -> Result<AccountRow> {
        let mut accounts = self.accounts.write();
        if accounts.values().any(|a| a.email == input.email) {
            bail!("account with email {} already exists", input.email);
        }
        if accounts.values().any(|a| a.api_key_hash == input.api_key_hash) {
            bail!("api key hash already in use");
        }

        let now = Self::now();
        let id = Uuid::now_v7();
        let row = AccountRow {
            id,
            email: input.email,
            api_key_hash: input.api_key_hash,
            api_key_prefix: input.api_key_prefix,
            discord_id: input.discord_id,
            plan: input.plan,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(id, row.clone());
        Ok(row)
    }

    pub async fn get_account(&self, id: Uuid) -> Result<Option<AccountRow>> {
        Ok(self.accounts.read().get(&id).cloned())
    }

    pub async fn get_account_by_api_key_hash(&self, key_hash: &str) -> Result<Option<AccountRow>> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.api_key_hash == key_hash)
            .cloned())
    }

    // ============================================
    // Event categories
    // ============================================

    pub async fn create_event_category(
        &self,
        input: CreateEventCategoryRow,
    ) -> Result<EventCategoryRow> {
        if !self.accounts.read().contains_key(&input.account_id) {
            bail!("account {} does not exist", input.account_id);
        }

        let mut categories = self.categories.write();
        if categories
            .values()
            .any(|c| c.account_id == input.account_id && c.name == input.name)
        {
            bail!("category {} already exists for account", input.name);
        }

        let id = Uuid::now_v7();
        let row = EventCategoryRow {
            id,
            account_id: input.account_id,
            name: input.name,
            color: input.color,
            emoji: input.emoji,
            created_at: Self::now(),
        };
        categories.insert(id, row.clone());
        Ok(row)
    }

    pub async fn get_event_category_by_name(
        &self,
        account_id: Uuid,
        name: &str,
    ) -> Result<Option<EventCategoryRow>> {
        Ok(self
            .categories
            .read()
            .values()
            .find(|c| c.account_id == account_id && c.name == name)
            .cloned())
    }

    // ============================================
    // Events and quotas
    // ============================================

    pub async fn create_event_within_quota(
        &self,
        input: CreateEventRow,
        limit: i32,
    ) -> Result<QuotaInsert> {
        let period = QuotaPeriod::containing(input.created_at);
        let mut ledger = self.ledger.lock();

        let used = ledger
            .quotas
            .get(&(input.account_id, period))
            .copied()
            .unwrap_or(0);
        if used >= limit {
            return Ok(QuotaInsert::Exceeded);
        }

        let id = Uuid::now_v7();
        let event = EventRow {
            id,
            account_id: input.account_id,
            category_id: input.category_id,
            category_name: input.category_name,
            fields: input.fields,
            description: input.description,
            formatted_message: input.formatted_message,
            delivery_status: "pending".to_string(),
            created_at: input.created_at,
        };
        ledger.events.insert(id, event.clone());
        ledger.quotas.insert((input.account_id, period), used + 1);

        Ok(QuotaInsert::Created {
            event,
            used: used + 1,
        })
    }

    pub async fn get_event(&self, id: Uuid) -> Result<Option<EventRow>> {
        Ok(self.ledger.lock().events.get(&id).cloned())
    }

    pub async fn count_events_for_account(&self, account_id: Uuid) -> Result<i64> {
        Ok(self
            .ledger
            .lock()
            .events
            .values()
            .filter(|e| e.account_id == account_id)
            .count() as i64)
    }

    pub async fn update_event_delivery_status(&self, id: Uuid, status: &str) -> Result<bool> {
        if let Some(event) = self.ledger.lock().events.get_mut(&id) {
            event.delivery_status = status.to_string();
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn get_quota_count(&self, account_id: Uuid, period: QuotaPeriod) -> Result<i32> {
        Ok(self
            .ledger
            .lock()
            .quotas
            .get(&(account_id, period))
            .copied()
            .unwrap_or(0))
    }

    /// Overwrite a period counter (fixtures for quota tests)
    pub fn set_quota_count(&self, account_id: Uuid, period: QuotaPeriod, count: i32) {
        self.ledger.lock().quotas.insert((account_id, period), count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    async fn seed(db: &InMemoryDatabase) -> (AccountRow, EventCategoryRow) {
        let account = db
            .create_account(CreateAccountRow {
                email: "owner@example.com".to_string(),
                api_key_hash: "hash".to_string(),
                api_key_prefix: "pp_abcd1234...".to_string(),
                discord_id: Some("1234".to_string()),
                plan: "free".to_string(),
            })
            .await
            .unwrap();

        let category = db
            .create_event_category(CreateEventCategoryRow {
                account_id: account.id,
                name: "sale".to_string(),
                color: None,
                emoji: None,
            })
            .await
            .unwrap();

        (account, category)
    }

    fn event_input(account: &AccountRow, category: &EventCategoryRow) -> CreateEventRow {
        CreateEventRow {
            account_id: account.id,
            category_id: category.id,
            category_name: category.name.clone(),
            fields: json!({"amount": 49.0}),
            description: None,
            formatted_message: "A new sale event has occurred!".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_account_lookup_by_hash() {
        let db = InMemoryDatabase::new();
        let (account, _) = seed(&db).await;

        let found = db.get_account_by_api_key_hash("hash").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(account.id));
        assert!(db
            .get_account_by_api_key_hash("other")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_category_names_unique_per_account() {
        let db = InMemoryDatabase::new();
        let (account, _) = seed(&db).await;

        let duplicate = db
            .create_event_category(CreateEventCategoryRow {
                account_id: account.id,
                name: "sale".to_string(),
                color: None,
                emoji: None,
            })
            .await;
        assert!(duplicate.is_err());

        assert!(db
            .get_event_category_by_name(account.id, "Sale")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_quota_stops_at_limit() {
        let db = InMemoryDatabase::new();
        let (account, category) = seed(&db).await;
        let period = QuotaPeriod::current();

        for expected in 1..=2 {
            match db
                .create_event_within_quota(event_input(&account, &category), 2)
                .await
                .unwrap()
            {
                QuotaInsert::Created { used, .. } => assert_eq!(used, expected),
                QuotaInsert::Exceeded => panic!("quota should not be exhausted yet"),
            }
        }

        let third = db
            .create_event_within_quota(event_input(&account, &category), 2)
            .await
            .unwrap();
        assert!(matches!(third, QuotaInsert::Exceeded));
        assert_eq!(db.get_quota_count(account.id, period).await.unwrap(), 2);
        assert_eq!(db.count_events_for_account(account.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_rejects_first_event() {
        let db = InMemoryDatabase::new();
        let (account, category) = seed(&db).await;

        let outcome = db
            .create_event_within_quota(event_input(&account, &category), 0)
            .await
            .unwrap();
        assert!(matches!(outcome, QuotaInsert::Exceeded));
        assert_eq!(db.count_events_for_account(account.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_event_timestamp_selects_quota_period() {
        let db = InMemoryDatabase::new();
        let (account, category) = seed(&db).await;
        let end_of_january = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let start_of_february = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let january = QuotaPeriod::containing(end_of_january);
        let february = QuotaPeriod::containing(start_of_february);

        for created_at in [end_of_january, start_of_february] {
            let input = CreateEventRow {
                created_at,
                ..event_input(&account, &category)
            };
            let QuotaInsert::Created { event, used } =
                db.create_event_within_quota(input, 1).await.unwrap()
            else {
                panic!("each month has its own slot");
            };
            assert_eq!(used, 1);
            assert_eq!(event.created_at, created_at);
        }

        assert_eq!(db.get_quota_count(account.id, january).await.unwrap(), 1);
        assert_eq!(db.get_quota_count(account.id, february).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_delivery_status() {
        let db = InMemoryDatabase::new();
        let (account, category) = seed(&db).await;

        let QuotaInsert::Created { event, .. } = db
            .create_event_within_quota(event_input(&account, &category), 10)
            .await
            .unwrap()
        else {
            panic!("expected event to be created");
        };
        assert_eq!(event.delivery_status, "pending");

        assert!(db
            .update_event_delivery_status(event.id, "delivered")
            .await
            .unwrap());
        let stored = db.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.delivery_status, "delivered");

        assert!(!db
            .update_event_delivery_status(Uuid::now_v7(), "failed")
            .await
            .unwrap());
    }
}
