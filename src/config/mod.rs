use rust_decimal::Decimal;
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use crate::models::Category;

const DEFAULT_DATA_API_URL: &str = "https://data-api.polymarket.com";
const DEFAULT_GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Upstream APIs
    pub data_api_url: String,
    pub gamma_api_url: String,
    pub http_timeout_secs: u64,

    // Feed
    pub min_bet_usd: Decimal,
    pub feed_page_limit: u32,
    pub backfill_max_pages: u32,

    // Profiler
    pub profiler_page_size: u32,
    pub profiler_max_pages: u32,

    // Evaluator
    pub max_account_age_days: i64,
    pub min_activity_count: u64,

    // Classifier
    pub category_keywords_path: Option<PathBuf>,

    // Notifications (optional — alerts still reach the durable sinks without them)
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub notifications_enabled: bool,
    pub notify_categories: HashSet<Category>,

    // Durable sinks
    pub database_url: Option<String>,
    pub alert_log_path: PathBuf,
    pub sheet_webhook_url: Option<String>,

    // Local state
    pub ledger_path: PathBuf,
    pub ledger_retention_days: i64,
    pub lock_path: PathBuf,
    pub lock_stale_secs: u64,

    // Scheduling
    pub dispatch_delay_ms: u64,
    pub scan_interval_secs: u64,
    pub rollup_interval_secs: u64,

    // HTTP surface (run mode only)
    pub host: String,
    pub http_port: Option<u16>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let notify_raw = env::var("NOTIFY_CATEGORIES").unwrap_or_else(|_| "politics".into());
        let notify_categories = parse_categories(&notify_raw)?;

        Ok(Self {
            data_api_url: env::var("DATA_API_URL").unwrap_or_else(|_| DEFAULT_DATA_API_URL.into()),
            gamma_api_url: env::var("GAMMA_API_URL")
                .unwrap_or_else(|_| DEFAULT_GAMMA_API_URL.into()),
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", 10),

            min_bet_usd: parse_or("MIN_BET_USD", Decimal::from(3_000)),
            feed_page_limit: parse_or("FEED_PAGE_LIMIT", 500),
            backfill_max_pages: parse_or("BACKFILL_MAX_PAGES", 20),

            profiler_page_size: parse_or("PROFILER_PAGE_SIZE", 100),
            profiler_max_pages: parse_or("PROFILER_MAX_PAGES", 3),

            max_account_age_days: parse_or("MAX_ACCOUNT_AGE_DAYS", 10),
            min_activity_count: parse_or("MIN_ACTIVITY_COUNT", 10),

            category_keywords_path: env::var("CATEGORY_KEYWORDS_PATH").ok().map(PathBuf::from),

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok().filter(|s| !s.is_empty()),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok().filter(|s| !s.is_empty()),
            notifications_enabled: parse_or("NOTIFICATIONS_ENABLED", true),
            notify_categories,

            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            alert_log_path: env::var("ALERT_LOG_PATH")
                .unwrap_or_else(|_| "alerts.jsonl".into())
                .into(),
            sheet_webhook_url: env::var("SHEET_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),

            ledger_path: env::var("LEDGER_PATH")
                .unwrap_or_else(|_| "sent_trades.json".into())
                .into(),
            ledger_retention_days: parse_or("LEDGER_RETENTION_DAYS", 7),
            lock_path: env::var("LOCK_PATH")
                .unwrap_or_else(|_| "polywatch.lock".into())
                .into(),
            lock_stale_secs: parse_or("LOCK_STALE_SECS", 900),

            dispatch_delay_ms: parse_or("DISPATCH_DELAY_MS", 1_000),
            scan_interval_secs: parse_or("SCAN_INTERVAL_SECS", 300),
            rollup_interval_secs: parse_or("ROLLUP_INTERVAL_SECS", 86_400),

            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            http_port: env::var("HTTP_PORT").ok().and_then(|p| p.parse().ok()),
        })
    }

    /// Returns true if the Telegram notifier can be constructed.
    pub fn has_telegram(&self) -> bool {
        self.notifications_enabled
            && self.telegram_bot_token.is_some()
            && self.telegram_chat_id.is_some()
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = key, value = %raw, "Unparseable config value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Parse a comma-separated category list such as `politics,crypto`.
pub fn parse_categories(raw: &str) -> anyhow::Result<HashSet<Category>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Category::from_config_str(s)
                .ok_or_else(|| anyhow::anyhow!("unknown category in NOTIFY_CATEGORIES: {s}"))
        })
        .collect()
}
