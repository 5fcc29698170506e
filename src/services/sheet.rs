use async_trait::async_trait;
use serde_json::json;

use crate::errors::SinkError;
use crate::models::AlertRecord;
use crate::services::dispatcher::SheetSink;

/// Posts each alert as a flat JSON row to a spreadsheet webhook
/// (e.g. an Apps Script endpoint appending to a Google Sheet).
#[derive(Debug, Clone)]
pub struct SheetWebhook {
    http: reqwest::Client,
    url: String,
}

impl SheetWebhook {
    pub fn new(http: reqwest::Client, url: String) -> Self {
        Self { http, url }
    }
}

pub fn sheet_row(alert: &AlertRecord) -> serde_json::Value {
    json!({
        "fingerprint": alert.trade_fingerprint,
        "bet_size": alert.usd_amount.round_dp(2).to_string(),
        "username": alert.display_name,
        "trader": alert.trader_id,
        "token_id": alert.token_id,
        "outcome": alert.outcome_label,
        "market": alert.market_title,
        "category": alert.category.as_str(),
        "account_age_days": alert.account_age_days,
        "activity_count": alert.activity_count,
        "timestamp": alert.dispatched_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

#[async_trait]
impl SheetSink for SheetWebhook {
    async fn append_row(&self, alert: &AlertRecord) -> Result<(), SinkError> {
        let resp = self.http.post(&self.url).json(&sheet_row(alert)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SinkError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
