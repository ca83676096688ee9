// Usage service: current-period quota consumption for an account

use anyhow::Result;
use pingpanda_core::{Account, PlanLimits, QuotaPeriod, QuotaUsage};
use std::sync::Arc;

use crate::storage::StorageBackend;

pub struct UsageService {
    db: Arc<StorageBackend>,
    limits: PlanLimits,
}

impl UsageService {
    pub fn new(db: Arc<StorageBackend>, limits: PlanLimits) -> Self {
        Self { db, limits }
    }

    pub async fn current(&self, account: &Account) -> Result<QuotaUsage> {
        self.for_period(account, QuotaPeriod::current()).await
    }

    pub async fn for_period(&self, account: &Account, period: QuotaPeriod) -> Result<QuotaUsage> {
        let used = self.db.get_quota_count(account.id, period).await?;
        Ok(QuotaUsage::new(
            account.plan,
            period,
            u32::try_from(used).unwrap_or(0),
            self.limits.monthly_events(account.plan),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ProvisioningService;
    use crate::storage::InMemoryDatabase;
    use pingpanda_core::Plan;

    #[tokio::test]
    async fn test_usage_reflects_counter() {
        let memory = Arc::new(InMemoryDatabase::new());
        let db = Arc::new(StorageBackend::InMemory(memory.clone()));
        let (account, _) = ProvisioningService::new(db.clone())
            .create_account("owner@example.com", None, Plan::Free)
            .await
            .unwrap();

        let service = UsageService::new(db, PlanLimits { free: 5, pro: 50 });
        let period = QuotaPeriod { year: 2024, month: 2 };

        let usage = service.for_period(&account, period).await.unwrap();
        assert_eq!(usage.used, 0);
        assert_eq!(usage.remaining, 5);

        memory.set_quota_count(account.id, period, 5);
        let usage = service.for_period(&account, period).await.unwrap();
        assert_eq!(usage.used, 5);
        assert_eq!(usage.remaining, 0);
        assert!(usage.is_exhausted());

        let other = QuotaPeriod { year: 2024, month: 3 };
        assert_eq!(service.for_period(&account, other).await.unwrap().used, 0);
    }
}
