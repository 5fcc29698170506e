use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::errors::MalformedRecord;
use crate::models::Trade;

/// Epoch values above this are milliseconds (10^11 seconds is year 5138).
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

type RawRecord = Map<String, Value>;

// ---------------------------------------------------------------------------
// Amount extraction
// ---------------------------------------------------------------------------

/// A named way of reading the USD notional from a provider record.
pub struct AmountStrategy {
    pub name: &'static str,
    pub extract: fn(&RawRecord) -> Option<Decimal>,
}

/// Evaluated in order; the first strategy that yields a value wins.
pub const AMOUNT_STRATEGIES: &[AmountStrategy] = &[
    AmountStrategy {
        name: "usdcSize",
        extract: usdc_size,
    },
    AmountStrategy {
        name: "amount",
        extract: direct_amount,
    },
    AmountStrategy {
        name: "price_x_size",
        extract: price_times_size,
    },
];

fn usdc_size(record: &RawRecord) -> Option<Decimal> {
    decimal_field(record, "usdcSize")
}

fn direct_amount(record: &RawRecord) -> Option<Decimal> {
    decimal_field(record, "amount")
}

/// Overflow yields `None`, so an absurd price or size reads as no amount.
fn price_times_size(record: &RawRecord) -> Option<Decimal> {
    decimal_field(record, "price")?.checked_mul(decimal_field(record, "size")?)
}

/// Returns the amount and the name of the strategy that produced it.
pub fn extract_amount(record: &RawRecord) -> Option<(Decimal, &'static str)> {
    AMOUNT_STRATEGIES
        .iter()
        .find_map(|s| (s.extract)(record).map(|amount| (amount, s.name)))
}

fn decimal_field(record: &RawRecord, key: &str) -> Option<Decimal> {
    parse_decimal(record.get(key)?)
}

/// Accepts JSON numbers and numeric strings, including scientific notation.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

// ---------------------------------------------------------------------------
// Timestamp normalization
// ---------------------------------------------------------------------------

/// Normalize an epoch (seconds or milliseconds, number or string) or an
/// ISO-8601 string to UTC.
pub fn normalize_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                from_epoch(i)
            } else {
                from_epoch_f64(n.as_f64()?)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return from_epoch(i);
            }
            if let Ok(f) = s.parse::<f64>() {
                return from_epoch_f64(f);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            // Naive forms are taken to be UTC
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value < 0 {
        return None;
    }
    if value > MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

fn from_epoch_f64(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let millis = if value > MILLIS_THRESHOLD as f64 {
        value
    } else {
        value * 1000.0
    };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

// ---------------------------------------------------------------------------
// Record → Trade
// ---------------------------------------------------------------------------

/// Normalize one provider trade record.
pub fn normalize_trade(value: Value) -> Result<Trade, MalformedRecord> {
    let record = match value {
        Value::Object(map) => map,
        _ => return Err(MalformedRecord::NotAnObject),
    };

    let trader_id = first_str(&record, &["proxyWallet", "user", "maker_address", "taker_address"])
        .ok_or(MalformedRecord::MissingTrader)?;

    let (usd_amount, strategy) = extract_amount(&record).ok_or(MalformedRecord::MissingAmount)?;
    if usd_amount.is_sign_negative() && !usd_amount.is_zero() {
        return Err(MalformedRecord::NegativeAmount(usd_amount.to_string()));
    }

    let observed_at = match record.get("timestamp") {
        Some(raw) => normalize_timestamp(raw)
            .ok_or_else(|| MalformedRecord::BadTimestamp(raw.to_string()))?,
        None => return Err(MalformedRecord::BadTimestamp("missing".into())),
    };

    let asset_id = first_str(&record, &["asset", "asset_id", "token_id"]);
    let tx_ref = first_str(&record, &["transactionHash", "transaction_hash", "id"])
        .or_else(|| asset_id.clone());

    tracing::trace!(trader = %trader_id, strategy = strategy, amount = %usd_amount, "Trade normalized");

    Ok(Trade {
        trader_id,
        market_title: first_str(&record, &["title", "question"])
            .unwrap_or_else(|| "Unknown Market".into()),
        outcome_label: first_str(&record, &["outcome"]).unwrap_or_default(),
        usd_amount,
        observed_at,
        tx_ref,
        asset_id,
        raw_provider_fields: record,
    })
}

fn first_str(record: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        record
            .get(*k)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    })
}
