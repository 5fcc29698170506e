use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use tokio::time::sleep;

use crate::config::AppConfig;
use crate::db::DedupLedger;
use crate::errors::ScanError;
use crate::ingestion::feed::{fetch_since, FeedPage, TradeFeed};
use crate::ingestion::run_lock::RunLock;
use crate::intelligence::{is_suspicious, AccountProfiler, MarketClassifier, ProfileCache, SuspicionThresholds};
use crate::models::{AlertRecord, Trade};
use crate::services::dispatcher::AlertDispatcher;

// ---------------------------------------------------------------------------
// Settings & reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub thresholds: SuspicionThresholds,
    pub ledger_path: PathBuf,
    pub ledger_retention_days: i64,
    pub lock_path: PathBuf,
    pub lock_stale_secs: u64,
    /// Pause after each enriched trade, keeping lookups under provider limits.
    pub dispatch_delay: Duration,
    pub backfill_max_pages: u32,
}

impl ScanSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            thresholds: SuspicionThresholds {
                min_amount: config.min_bet_usd,
                max_account_age_days: config.max_account_age_days,
                min_activity_count: config.min_activity_count,
            },
            ledger_path: config.ledger_path.clone(),
            ledger_retention_days: config.ledger_retention_days,
            lock_path: config.lock_path.clone(),
            lock_stale_secs: config.lock_stale_secs,
            dispatch_delay: Duration::from_millis(config.dispatch_delay_ms),
            backfill_max_pages: config.backfill_max_pages,
        }
    }
}

/// Terminal state of one trade within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOutcome {
    BelowFloor,
    AlreadySeen,
    NotSuspicious,
    Alerted,
    DispatchFailed,
}

impl TradeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeOutcome::BelowFloor => "below_floor",
            TradeOutcome::AlreadySeen => "already_seen",
            TradeOutcome::NotSuspicious => "not_suspicious",
            TradeOutcome::Alerted => "alerted",
            TradeOutcome::DispatchFailed => "dispatch_failed",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub started_at: Option<DateTime<Utc>>,
    pub fetched: usize,
    pub malformed: usize,
    pub below_floor: usize,
    pub already_seen: usize,
    pub not_suspicious: usize,
    pub alerted: usize,
    pub dispatch_failed: usize,
    /// Trader lookups performed (cache misses).
    pub profiles_fetched: usize,
    pub duration_ms: u64,
}

impl CycleReport {
    fn record(&mut self, outcome: TradeOutcome) {
        match outcome {
            TradeOutcome::BelowFloor => self.below_floor += 1,
            TradeOutcome::AlreadySeen => self.already_seen += 1,
            TradeOutcome::NotSuspicious => self.not_suspicious += 1,
            TradeOutcome::Alerted => self.alerted += 1,
            TradeOutcome::DispatchFailed => self.dispatch_failed += 1,
        }
    }
}

enum ScanMode {
    Latest,
    Since(DateTime<Utc>),
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// One pass of the alert pipeline:
/// 1. Fetch large trades
/// 2. Per trade: amount floor, dedup check, enrich trader, classify market
/// 3. Evaluate the fresh-wallet rule and dispatch
/// 4. Mark and persist the fingerprint once the notification went out
pub struct Scanner {
    feed: Arc<dyn TradeFeed>,
    profiler: AccountProfiler,
    classifier: MarketClassifier,
    dispatcher: Arc<AlertDispatcher>,
    settings: ScanSettings,
}

impl Scanner {
    pub fn new(
        feed: Arc<dyn TradeFeed>,
        profiler: AccountProfiler,
        classifier: MarketClassifier,
        dispatcher: Arc<AlertDispatcher>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            feed,
            profiler,
            classifier,
            dispatcher,
            settings,
        }
    }

    pub fn dispatcher(&self) -> &Arc<AlertDispatcher> {
        &self.dispatcher
    }

    /// Scan the latest page of large trades.
    pub async fn run_cycle(&self) -> Result<CycleReport, ScanError> {
        self.scan(ScanMode::Latest).await
    }

    /// Scan every large trade of the last `hours` hours.
    pub async fn backfill(&self, hours: i64) -> Result<CycleReport, ScanError> {
        let cutoff = Utc::now() - chrono::Duration::hours(hours.max(0));
        self.scan(ScanMode::Since(cutoff)).await
    }

    async fn scan(&self, mode: ScanMode) -> Result<CycleReport, ScanError> {
        let start = Instant::now();
        let _lock = RunLock::acquire(&self.settings.lock_path, self.settings.lock_stale_secs)?;
        let started_at = Utc::now();
        let min_amount = self.settings.thresholds.min_amount;

        let page: FeedPage = match mode {
            ScanMode::Latest => self.feed.fetch_page(min_amount, None).await?,
            ScanMode::Since(cutoff) => {
                fetch_since(
                    self.feed.as_ref(),
                    min_amount,
                    cutoff,
                    self.settings.backfill_max_pages,
                )
                .await?
            }
        };

        let mut ledger = DedupLedger::load(
            &self.settings.ledger_path,
            self.settings.ledger_retention_days,
            started_at,
        );
        let mut cache = ProfileCache::new();
        let mut report = CycleReport {
            started_at: Some(started_at),
            fetched: page.trades.len(),
            malformed: page.malformed,
            ..Default::default()
        };

        for trade in &page.trades {
            let outcome = self.process_trade(trade, &mut ledger, &mut cache).await;
            counter!("trades_scanned_total", "outcome" => outcome.as_str()).increment(1);
            report.record(outcome);
        }

        report.profiles_fetched = cache.len();
        report.duration_ms = start.elapsed().as_millis() as u64;
        histogram!("scan_cycle_seconds").record(start.elapsed().as_secs_f64());

        tracing::info!(
            fetched = report.fetched,
            malformed = report.malformed,
            below_floor = report.below_floor,
            already_seen = report.already_seen,
            not_suspicious = report.not_suspicious,
            alerted = report.alerted,
            dispatch_failed = report.dispatch_failed,
            profiles = report.profiles_fetched,
            duration_ms = report.duration_ms,
            "Scan cycle complete"
        );

        Ok(report)
    }

    async fn process_trade(
        &self,
        trade: &Trade,
        ledger: &mut DedupLedger,
        cache: &mut ProfileCache,
    ) -> TradeOutcome {
        let thresholds = &self.settings.thresholds;

        if trade.usd_amount < thresholds.min_amount {
            return TradeOutcome::BelowFloor;
        }

        let fingerprint = trade.fingerprint();
        if ledger.is_seen(&fingerprint) {
            tracing::debug!(fingerprint = %fingerprint, "Trade already alerted, skipping");
            return TradeOutcome::AlreadySeen;
        }

        let profile = self.profiler.profile(cache, &trade.trader_id).await;
        let now = Utc::now();

        let outcome = if !is_suspicious(trade, &profile, thresholds, now) {
            tracing::debug!(
                trader = %trade.trader_id,
                amount = %trade.usd_amount,
                activity = profile.activity_count_lower_bound,
                "Established account, no alert"
            );
            TradeOutcome::NotSuspicious
        } else {
            let category = self.classifier.classify(&trade.market_title);
            let alert = AlertRecord::build(trade, &profile, category, now);

            tracing::info!(
                trader = %trade.trader_id,
                amount = %trade.usd_amount,
                market = %trade.market_title,
                category = %category,
                "Fresh wallet large trade detected"
            );

            let dispatched = self.dispatcher.dispatch(&alert).await;
            if dispatched.should_mark_sent() {
                ledger.mark(&fingerprint, now);
                // Persist right away so a crash later in the cycle cannot re-alert
                if let Err(e) = ledger.save() {
                    tracing::error!(error = %e, path = %ledger.path().display(), "Failed to save dedup ledger");
                }
                TradeOutcome::Alerted
            } else {
                tracing::warn!(
                    fingerprint = %fingerprint,
                    "Notification failed, trade left unmarked for retry"
                );
                TradeOutcome::DispatchFailed
            }
        };

        if !self.settings.dispatch_delay.is_zero() {
            sleep(self.settings.dispatch_delay).await;
        }

        outcome
    }
}
