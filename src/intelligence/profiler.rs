use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::ProfilerError;
use crate::ingestion::normalize::normalize_timestamp;
use crate::models::AccountProfile;

/// Activity count reported when the activity source fails. Large enough to
/// read as an established account so a profiler outage suppresses alerts
/// instead of flooding them.
pub const ESTABLISHED_SENTINEL: u64 = 10_000;

/// Per-address activity history, oldest records first.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn fetch_activity(
        &self,
        trader_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, ProfilerError>;
}

/// Public user directory.
#[async_trait]
pub trait DisplayNameSource: Send + Sync {
    async fn display_name(&self, trader_id: &str) -> Result<Option<String>, ProfilerError>;
}

/// Profiles already computed during the current scan cycle. Created fresh per
/// cycle and dropped at its end.
#[derive(Debug, Default)]
pub struct ProfileCache {
    profiles: HashMap<String, AccountProfile>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, trader_id: &str) -> Option<&AccountProfile> {
        self.profiles.get(&trader_id.to_lowercase())
    }

    pub fn insert(&mut self, profile: AccountProfile) {
        self.profiles.insert(profile.trader_id.to_lowercase(), profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[derive(Clone)]
pub struct AccountProfiler {
    activity: Arc<dyn ActivitySource>,
    names: Option<Arc<dyn DisplayNameSource>>,
    page_size: u32,
    max_pages: u32,
}

impl AccountProfiler {
    pub fn new(
        activity: Arc<dyn ActivitySource>,
        names: Option<Arc<dyn DisplayNameSource>>,
        page_size: u32,
        max_pages: u32,
    ) -> Self {
        Self {
            activity,
            names,
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
        }
    }

    /// Profile a trader, reusing the cycle cache when possible.
    pub async fn profile(&self, cache: &mut ProfileCache, trader_id: &str) -> AccountProfile {
        if let Some(hit) = cache.get(trader_id) {
            return hit.clone();
        }

        let (first_activity_at, activity_count_lower_bound) =
            match self.scan_activity(trader_id).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        trader = %trader_id,
                        "Activity lookup failed, treating account as established"
                    );
                    (None, ESTABLISHED_SENTINEL)
                }
            };

        let profile = AccountProfile {
            trader_id: trader_id.to_string(),
            display_name: self.resolve_name(trader_id).await,
            first_activity_at,
            activity_count_lower_bound,
        };

        tracing::debug!(
            trader = %trader_id,
            first_activity = ?profile.first_activity_at,
            activity = profile.activity_count_lower_bound,
            "Account profiled"
        );

        cache.insert(profile.clone());
        profile
    }

    /// Earliest timestamp seen and total records over at most `max_pages`.
    async fn scan_activity(
        &self,
        trader_id: &str,
    ) -> Result<(Option<DateTime<Utc>>, u64), ProfilerError> {
        let mut earliest: Option<DateTime<Utc>> = None;
        let mut count: u64 = 0;

        for page in 0..self.max_pages {
            let offset = page * self.page_size;
            let records = self
                .activity
                .fetch_activity(trader_id, self.page_size, offset)
                .await?;

            count += records.len() as u64;
            let page_earliest = records
                .iter()
                .filter_map(|r| r.get("timestamp").and_then(normalize_timestamp))
                .min();
            earliest = match (earliest, page_earliest) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };

            if records.len() < self.page_size as usize {
                break;
            }
        }

        Ok((earliest, count))
    }

    async fn resolve_name(&self, trader_id: &str) -> String {
        let Some(names) = &self.names else {
            return trader_id.to_string();
        };

        match names.display_name(trader_id).await {
            Ok(Some(name)) => name,
            Ok(None) => trader_id.to_string(),
            Err(e) => {
                tracing::debug!(error = %e, trader = %trader_id, "Display name lookup failed");
                trader_id.to_string()
            }
        }
    }
}
