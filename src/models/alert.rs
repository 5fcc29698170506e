use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountProfile, Category, Trade};

/// One accepted alert. Written once per unique fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub trade_fingerprint: String,
    pub trader_id: String,
    pub display_name: String,
    pub usd_amount: Decimal,
    pub outcome_label: String,
    pub market_title: String,
    pub category: Category,
    pub account_age_days: Option<i64>,
    pub activity_count: u64,
    /// Outcome token traded, when the provider reported one.
    #[serde(default)]
    pub token_id: Option<String>,
    pub dispatched_at: DateTime<Utc>,
}

impl AlertRecord {
    pub fn build(
        trade: &Trade,
        profile: &AccountProfile,
        category: Category,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            trade_fingerprint: trade.fingerprint(),
            trader_id: trade.trader_id.clone(),
            display_name: profile.display_name.clone(),
            usd_amount: trade.usd_amount,
            outcome_label: trade.outcome_label.clone(),
            market_title: trade.market_title.clone(),
            category,
            account_age_days: profile.account_age_days(now),
            activity_count: profile.activity_count_lower_bound,
            token_id: trade.asset_id.clone(),
            dispatched_at: now,
        }
    }
}
