use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AccountProfile, Trade};

/// Thresholds for the fresh-wallet verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspicionThresholds {
    /// USD floor; re-checked here even though the feed filters server-side.
    pub min_amount: Decimal,
    /// Accounts at most this many days old are fresh (default 10).
    pub max_account_age_days: i64,
    /// Accounts with fewer activity records than this are fresh (default 10).
    pub min_activity_count: u64,
}

impl Default for SuspicionThresholds {
    fn default() -> Self {
        Self {
            min_amount: Decimal::from(3_000),
            max_account_age_days: 10,
            min_activity_count: 10,
        }
    }
}

/// A large trade is suspicious when either novelty signal fires:
/// the account is young (when its age is known) or it has little activity.
/// Unknown age never counts as young.
pub fn is_suspicious(
    trade: &Trade,
    profile: &AccountProfile,
    thresholds: &SuspicionThresholds,
    now: DateTime<Utc>,
) -> bool {
    if trade.usd_amount < thresholds.min_amount {
        return false;
    }

    let young = profile
        .account_age_days(now)
        .is_some_and(|days| days <= thresholds.max_account_age_days);
    let quiet = profile.activity_count_lower_bound < thresholds.min_activity_count;

    young || quiet
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn case(amount: i64, age_days: Option<i64>, activity: u64) -> bool {
        let now = Utc::now();
        let trade = Trade {
            trader_id: "0xfresh".into(),
            market_title: "m".into(),
            outcome_label: "Yes".into(),
            usd_amount: Decimal::from(amount),
            observed_at: now,
            tx_ref: None,
            asset_id: None,
            raw_provider_fields: Default::default(),
        };
        let profile = AccountProfile {
            trader_id: "0xfresh".into(),
            display_name: "0xfresh".into(),
            first_activity_at: age_days.map(|d| now - Duration::days(d)),
            activity_count_lower_bound: activity,
        };
        is_suspicious(&trade, &profile, &SuspicionThresholds::default(), now)
    }

    #[test]
    fn test_young_account_alone_is_enough() {
        assert!(case(5_000, Some(3), 50));
    }

    #[test]
    fn test_low_activity_alone_is_enough() {
        assert!(case(5_000, Some(400), 2));
    }

    #[test]
    fn test_established_account_is_not_suspicious() {
        assert!(!case(5_000, Some(400), 50));
    }

    #[test]
    fn test_age_boundary_is_inclusive() {
        assert!(case(5_000, Some(10), 50));
        assert!(!case(5_000, Some(11), 50));
    }

    #[test]
    fn test_unknown_age_is_not_young() {
        assert!(!case(5_000, None, 50));
        assert!(case(5_000, None, 0));
    }

    #[test]
    fn test_below_floor_never_suspicious() {
        assert!(!case(2_999, Some(0), 0));
        assert!(case(3_000, Some(0), 0));
    }
}
