// Quota accounting
//
// Quotas are calendar-month aligned in UTC: every account gets a fresh
// counter on the first instant of each month.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::account::Plan;

/// A calendar month in UTC.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct QuotaPeriod {
    pub year: i32,
    /// Month of the year, 1-12.
    pub month: u32,
}

impl QuotaPeriod {
    pub fn containing(ts: DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    /// First instant of the following period, when the counter resets.
    pub fn resets_at(&self) -> DateTime<Utc> {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl std::fmt::Display for QuotaPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Usage of an account within one quota period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct QuotaUsage {
    pub plan: Plan,
    pub period: QuotaPeriod,
    /// Events ingested in the period.
    pub used: u32,
    /// Ceiling for the period.
    pub limit: u32,
    /// Events still allowed in the period.
    pub remaining: u32,
    /// When the counter resets.
    pub resets_at: DateTime<Utc>,
}

impl QuotaUsage {
    pub fn new(plan: Plan, period: QuotaPeriod, used: u32, limit: u32) -> Self {
        Self {
            plan,
            period,
            used,
            limit,
            remaining: limit.saturating_sub(used),
            resets_at: period.resets_at(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_containing() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();
        assert_eq!(
            QuotaPeriod::containing(ts),
            QuotaPeriod {
                year: 2024,
                month: 3
            }
        );
    }

    #[test]
    fn test_resets_at_rolls_over_year() {
        let december = QuotaPeriod {
            year: 2024,
            month: 12,
        };
        assert_eq!(
            december.resets_at(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );

        let june = QuotaPeriod {
            year: 2024,
            month: 6,
        };
        assert_eq!(
            june.resets_at(),
            Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_usage_remaining_saturates() {
        let period = QuotaPeriod {
            year: 2024,
            month: 6,
        };
        let usage = QuotaUsage::new(Plan::Free, period, 120, 100);
        assert_eq!(usage.remaining, 0);
        assert!(usage.is_exhausted());

        let usage = QuotaUsage::new(Plan::Pro, period, 10, 1000);
        assert_eq!(usage.remaining, 990);
        assert!(!usage.is_exhausted());
    }

    #[test]
    fn test_period_display() {
        let period = QuotaPeriod {
            year: 2024,
            month: 6,
        };
        assert_eq!(period.to_string(), "2024-06");
    }
}
