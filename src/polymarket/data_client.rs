use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;

use super::types::{ActivityQuery, TradesQuery};
use crate::errors::{FeedError, ProfilerError};
use crate::ingestion::feed::{FeedPage, TradeFeed};
use crate::ingestion::normalize::normalize_trade;
use crate::intelligence::profiler::ActivitySource;

const DATA_API_BASE: &str = "https://data-api.polymarket.com";

/// Polymarket Data API client: the trade feed and the activity source.
#[derive(Debug, Clone)]
pub struct DataClient {
    http: Client,
    base_url: String,
    page_limit: u32,
}

impl DataClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: DATA_API_BASE.into(),
            page_limit: 500,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// Fetch raw trade records above a USD floor.
    pub async fn get_large_trades(
        &self,
        min_amount: Decimal,
        offset: u32,
    ) -> Result<Vec<Value>, FeedError> {
        let url = format!("{}/trades", self.base_url);
        let query = TradesQuery {
            limit: self.page_limit,
            offset,
            filter_type: "CASH",
            filter_amount: min_amount.normalize().to_string(),
            taker_only: true,
        };

        let body = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        decode_array(&body).map_err(FeedError::Decode)
    }

    /// Fetch one page of a user's activity, oldest first.
    pub async fn get_user_activity(
        &self,
        user: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, ProfilerError> {
        let url = format!("{}/activity", self.base_url);
        let body = self
            .http
            .get(&url)
            .query(&ActivityQuery::oldest_first(user, limit, offset))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        decode_array(&body).map_err(ProfilerError::Unexpected)
    }
}

fn decode_array(body: &str) -> Result<Vec<Value>, String> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(other) => Err(format!("expected array, got {}", type_name(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl TradeFeed for DataClient {
    async fn fetch_page(
        &self,
        min_amount: Decimal,
        cursor: Option<u32>,
    ) -> Result<FeedPage, FeedError> {
        let offset = cursor.unwrap_or(0);
        let records = self.get_large_trades(min_amount, offset).await?;
        let received = records.len();

        let mut page = FeedPage {
            received,
            ..Default::default()
        };
        for record in records {
            match normalize_trade(record) {
                // The server-side filter is not trusted
                Ok(trade) if trade.usd_amount < min_amount => {
                    tracing::debug!(
                        trader = %trade.trader_id,
                        amount = %trade.usd_amount,
                        "Feed returned trade below floor, dropping"
                    );
                }
                Ok(trade) => page.trades.push(trade),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed trade record");
                    page.malformed += 1;
                }
            }
        }

        page.next_cursor = (received >= self.page_limit as usize)
            .then(|| offset + self.page_limit);

        tracing::debug!(
            offset = offset,
            received = received,
            kept = page.trades.len(),
            malformed = page.malformed,
            "Fetched trade page"
        );

        Ok(page)
    }
}

#[async_trait]
impl ActivitySource for DataClient {
    async fn fetch_activity(
        &self,
        trader_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, ProfilerError> {
        self.get_user_activity(trader_id, limit, offset).await
    }
}
