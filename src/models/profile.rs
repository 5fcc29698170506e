use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Novelty estimate for a trader.
///
/// `first_activity_at` is the earliest activity record the profiler could
/// observe, not a registration date. No account-creation endpoint is assumed
/// reachable, so account age is an approximation that can only overstate
/// how new an account is when the activity source has gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub trader_id: String,
    pub display_name: String,
    pub first_activity_at: Option<DateTime<Utc>>,
    /// Records counted across the pages that were fetched; the real
    /// history may be longer.
    pub activity_count_lower_bound: u64,
}

impl AccountProfile {
    /// Whole days since the earliest observed activity, if known.
    pub fn account_age_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.first_activity_at
            .map(|first| (now - first).num_days().max(0))
    }
}
