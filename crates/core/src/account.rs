// Account domain types
//
// An account owns categories and events and is bound to a plan.
// Accounts are created out-of-band; ingestion only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Default monthly event ceiling for the free plan.
pub const FREE_PLAN_MONTHLY_EVENTS: u32 = 100;
/// Default monthly event ceiling for the pro plan.
pub const PRO_PLAN_MONTHLY_EVENTS: u32 = 1000;

/// Billing plan tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Pro => write!(f, "pro"),
        }
    }
}

impl From<&str> for Plan {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pro" => Plan::Pro,
            _ => Plan::Free,
        }
    }
}

/// Monthly event ceilings per plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub free: u32,
    pub pro: u32,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            free: FREE_PLAN_MONTHLY_EVENTS,
            pro: PRO_PLAN_MONTHLY_EVENTS,
        }
    }
}

impl PlanLimits {
    /// Ceiling for the given plan.
    pub fn monthly_events(&self, plan: Plan) -> u32 {
        match plan {
            Plan::Free => self.free,
            Plan::Pro => self.pro,
        }
    }
}

/// Account - the billing and authentication entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Account {
    /// Unique identifier for the account.
    pub id: Uuid,
    /// Contact email.
    pub email: String,
    /// Display prefix of the API key (the full key is never stored).
    pub api_key_prefix: String,
    /// Discord user id that notifications are delivered to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_id: Option<String>,
    /// Current plan tier.
    pub plan: Plan,
    /// Timestamp when the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// An account can receive events only once a Discord id is configured.
    pub fn delivery_target(&self) -> Option<&str> {
        self.discord_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(discord_id: Option<&str>) -> Account {
        Account {
            id: Uuid::nil(),
            email: "owner@example.com".to_string(),
            api_key_prefix: "pp_abcd1234...".to_string(),
            discord_id: discord_id.map(String::from),
            plan: Plan::Free,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_round_trip_through_str() {
        assert_eq!(Plan::from("pro"), Plan::Pro);
        assert_eq!(Plan::from("PRO"), Plan::Pro);
        assert_eq!(Plan::from("free"), Plan::Free);
        assert_eq!(Plan::from("unknown"), Plan::Free);
        assert_eq!(Plan::Pro.to_string(), "pro");
    }

    #[test]
    fn test_plan_limits_defaults() {
        let limits = PlanLimits::default();
        assert_eq!(limits.monthly_events(Plan::Free), 100);
        assert_eq!(limits.monthly_events(Plan::Pro), 1000);
    }

    #[test]
    fn test_delivery_target() {
        assert_eq!(account(Some("1234")).delivery_target(), Some("1234"));
        assert_eq!(account(Some("   ")).delivery_target(), None);
        assert_eq!(account(None).delivery_target(), None);
    }
}
