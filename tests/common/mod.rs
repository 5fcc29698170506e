use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use polywatch::errors::{FeedError, ProfilerError, SinkError};
use polywatch::ingestion::{normalize_trade, FeedPage, ScanSettings, Scanner, TradeFeed};
use polywatch::intelligence::{AccountProfiler, ActivitySource, MarketClassifier, SuspicionThresholds};
use polywatch::models::{AlertRecord, Category};
use polywatch::services::{AlertDispatcher, AlertStore, NotificationSink};

/// Trade feed serving a fixed set of raw provider records.
#[derive(Default)]
pub struct FakeFeed {
    pub records: Mutex<Vec<Value>>,
    pub fail: AtomicBool,
}

#[allow(dead_code)]
impl FakeFeed {
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: Mutex::new(records),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TradeFeed for FakeFeed {
    async fn fetch_page(
        &self,
        _min_amount: Decimal,
        _cursor: Option<u32>,
    ) -> Result<FeedPage, FeedError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FeedError::Decode("upstream returned HTML".into()));
        }

        let records = self.records.lock().unwrap().clone();
        let mut page = FeedPage {
            received: records.len(),
            ..Default::default()
        };
        for record in records {
            match normalize_trade(record) {
                Ok(trade) => page.trades.push(trade),
                Err(_) => page.malformed += 1,
            }
        }
        Ok(page)
    }
}

/// Activity history keyed by lowercase address; unknown addresses have none.
#[derive(Default)]
pub struct FakeActivity {
    pub history: HashMap<String, Vec<Value>>,
}

#[allow(dead_code)]
impl FakeActivity {
    /// Address with `count` records, the oldest `age_days` ago.
    pub fn with_account(mut self, address: &str, age_days: i64, count: usize) -> Self {
        let oldest = Utc::now().timestamp() - age_days * 86_400;
        let records = (0..count)
            .map(|i| json!({ "timestamp": oldest + i as i64 * 60, "type": "TRADE" }))
            .collect();
        self.history.insert(address.to_lowercase(), records);
        self
    }
}

#[async_trait]
impl ActivitySource for FakeActivity {
    async fn fetch_activity(
        &self,
        trader_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, ProfilerError> {
        let records = self
            .history
            .get(&trader_id.to_lowercase())
            .cloned()
            .unwrap_or_default();
        Ok(records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
    /// `(filename, caption, body)` of every uploaded document.
    pub documents: Mutex<Vec<(String, String, String)>>,
    pub fail: AtomicBool,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::Status {
                status: 502,
                body: "Bad Gateway".into(),
            });
        }
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn notify_document(
        &self,
        filename: &str,
        caption: &str,
        body: Vec<u8>,
    ) -> Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::Status {
                status: 502,
                body: "Bad Gateway".into(),
            });
        }
        self.documents.lock().unwrap().push((
            filename.to_string(),
            caption.to_string(),
            String::from_utf8(body).unwrap(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub rows: Mutex<Vec<AlertRecord>>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn rows(&self) -> Vec<AlertRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn append(&self, alert: &AlertRecord) -> Result<(), SinkError> {
        self.rows.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Raw Data API trade record observed `age_secs` ago.
#[allow(dead_code)]
pub fn trade_record(address: &str, title: &str, usd: u64, tx: &str, age_secs: i64) -> Value {
    json!({
        "proxyWallet": address,
        "title": title,
        "outcome": "Yes",
        "usdcSize": usd,
        "timestamp": Utc::now().timestamp() - age_secs,
        "transactionHash": tx,
    })
}

#[allow(dead_code)]
pub fn settings(dir: &Path) -> ScanSettings {
    ScanSettings {
        thresholds: SuspicionThresholds::default(),
        ledger_path: dir.join("sent_trades.json"),
        ledger_retention_days: 7,
        lock_path: dir.join("polywatch.lock"),
        lock_stale_secs: 900,
        dispatch_delay: Duration::ZERO,
        backfill_max_pages: 5,
    }
}

/// Scanner wired to in-memory fakes, routing only politics to chat.
#[allow(dead_code)]
pub fn build_scanner(
    dir: &Path,
    feed: Arc<FakeFeed>,
    activity: FakeActivity,
    notifier: Arc<RecordingNotifier>,
    store: Arc<MemoryStore>,
) -> Scanner {
    let profiler = AccountProfiler::new(Arc::new(activity), None, 100, 3);
    let dispatcher = AlertDispatcher::new([Category::Politics].into_iter().collect())
        .with_notifier(notifier)
        .with_store(store);

    Scanner::new(
        feed,
        profiler,
        MarketClassifier::default(),
        Arc::new(dispatcher),
        settings(dir),
    )
}
