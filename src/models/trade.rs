use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A trade normalized from the market-data provider.
///
/// `usd_amount` is always in USD and `observed_at` always in UTC, whatever
/// units or encodings the provider used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trader_id: String,
    pub market_title: String,
    pub outcome_label: String,
    pub usd_amount: Decimal,
    pub observed_at: DateTime<Utc>,
    /// Transaction hash, provider trade id, or asset id — whichever is present.
    pub tx_ref: Option<String>,
    pub asset_id: Option<String>,
    #[serde(default)]
    pub raw_provider_fields: serde_json::Map<String, serde_json::Value>,
}

impl Trade {
    /// Stable content hash used as the dedup key.
    ///
    /// Only fields that survive re-fetching are hashed, so overlapping pages
    /// yield the same fingerprint for the same trade.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.trader_id.to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(self.tx_ref.as_deref().unwrap_or_default().as_bytes());
        hasher.update(b"|");
        hasher.update(self.observed_at.timestamp().to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.usd_amount.normalize().to_string().as_bytes());

        format!("{:x}", hasher.finalize())
    }
}
