use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;

use crate::errors::SinkError;
use crate::models::{AlertRecord, Category};
use crate::services::notifier::{format_alert, format_rollup};
use crate::services::report::{alerts_csv, report_filename};

// ---------------------------------------------------------------------------
// Sink seams
// ---------------------------------------------------------------------------

/// Chat channel. Rate-limited and the most failure-prone sink.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), SinkError>;

    /// Send a file attachment with a caption.
    async fn notify_document(
        &self,
        filename: &str,
        caption: &str,
        body: Vec<u8>,
    ) -> Result<(), SinkError>;
}

/// Durable append-only row store.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn append(&self, alert: &AlertRecord) -> Result<(), SinkError>;

    fn name(&self) -> &'static str;
}

/// External spreadsheet.
#[async_trait]
pub trait SheetSink: Send + Sync {
    async fn append_row(&self, alert: &AlertRecord) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Delivered,
    Failed(String),
    /// Configured but not used for this alert (category policy).
    Skipped,
    /// Not configured.
    Disabled,
}

impl SinkOutcome {
    fn from_result(sink: &'static str, result: Result<(), SinkError>) -> Self {
        match result {
            Ok(()) => SinkOutcome::Delivered,
            Err(e) => {
                tracing::warn!(sink = sink, error = %e, "Alert sink failed");
                counter!("sink_failures_total", "sink" => sink).increment(1);
                SinkOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SinkOutcome::Failed(_))
    }
}

impl fmt::Display for SinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkOutcome::Delivered => f.write_str("delivered"),
            SinkOutcome::Failed(e) => write!(f, "failed ({e})"),
            SinkOutcome::Skipped => f.write_str("skipped"),
            SinkOutcome::Disabled => f.write_str("disabled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub notification: SinkOutcome,
    pub store: SinkOutcome,
    pub sheet: SinkOutcome,
}

impl DispatchOutcome {
    /// Only the notification sink gates the dedup mark. A failed
    /// notification leaves the trade unmarked so the next cycle retries it.
    pub fn should_mark_sent(&self) -> bool {
        !self.notification.is_failed()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Rollup {
    since: DateTime<Utc>,
    counts: BTreeMap<Category, u64>,
    /// Alerts of the period, in dispatch order, for the CSV report.
    alerts: Vec<AlertRecord>,
}

pub struct AlertDispatcher {
    notifier: Option<Arc<dyn NotificationSink>>,
    store: Option<Arc<dyn AlertStore>>,
    sheet: Option<Arc<dyn SheetSink>>,
    notify_categories: HashSet<Category>,
    report_threshold: Option<Decimal>,
    rollup: Mutex<Rollup>,
}

impl AlertDispatcher {
    pub fn new(notify_categories: HashSet<Category>) -> Self {
        Self {
            notifier: None,
            store: None,
            sheet: None,
            notify_categories,
            report_threshold: None,
            rollup: Mutex::new(Rollup {
                since: Utc::now(),
                counts: BTreeMap::new(),
                alerts: Vec::new(),
            }),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn AlertStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_sheet(mut self, sheet: Arc<dyn SheetSink>) -> Self {
        self.sheet = Some(sheet);
        self
    }

    /// USD floor quoted in the roll-up caption.
    pub fn with_report_threshold(mut self, min_amount: Decimal) -> Self {
        self.report_threshold = Some(min_amount);
        self
    }

    /// Fan an alert out to every configured sink. Sinks are independent:
    /// a failure in one is logged and the others still run.
    pub async fn dispatch(&self, alert: &AlertRecord) -> DispatchOutcome {
        let notification = match &self.notifier {
            None => SinkOutcome::Disabled,
            Some(_) if !self.notify_categories.contains(&alert.category) => {
                tracing::debug!(
                    category = %alert.category,
                    fingerprint = %alert.trade_fingerprint,
                    "Category not routed to chat"
                );
                SinkOutcome::Skipped
            }
            Some(n) => SinkOutcome::from_result("notification", n.notify(&format_alert(alert)).await),
        };

        let store = match &self.store {
            None => SinkOutcome::Disabled,
            Some(s) => SinkOutcome::from_result(s.name(), s.append(alert).await),
        };

        let sheet = match &self.sheet {
            None => SinkOutcome::Disabled,
            Some(s) => SinkOutcome::from_result("sheet", s.append_row(alert).await),
        };

        let outcome = DispatchOutcome {
            notification,
            store,
            sheet,
        };

        if outcome.should_mark_sent() {
            counter!("alerts_dispatched_total", "category" => alert.category.as_str()).increment(1);
            if let Ok(mut rollup) = self.rollup.lock() {
                *rollup.counts.entry(alert.category).or_insert(0) += 1;
                rollup.alerts.push(alert.clone());
            }
        }

        tracing::info!(
            fingerprint = %alert.trade_fingerprint,
            trader = %alert.trader_id,
            category = %alert.category,
            amount = %alert.usd_amount,
            notification = %outcome.notification,
            store = %outcome.store,
            sheet = %outcome.sheet,
            "Alert dispatched"
        );

        outcome
    }

    /// Alert counts per category accumulated since the last roll-up.
    pub fn rollup_counts(&self) -> BTreeMap<Category, u64> {
        self.rollup
            .lock()
            .map(|r| r.counts.clone())
            .unwrap_or_default()
    }

    /// Send the roll-up: a CSV report of the period's alerts captioned with
    /// the per-category summary. The period resets only when it was
    /// delivered; nothing is sent when no alert went out since the last one.
    pub async fn send_rollup(&self) -> SinkOutcome {
        let Some(notifier) = &self.notifier else {
            return SinkOutcome::Disabled;
        };

        let (counts, since, alerts) = match self.rollup.lock() {
            Ok(r) => (r.counts.clone(), r.since, r.alerts.clone()),
            Err(_) => return SinkOutcome::Failed("roll-up state poisoned".into()),
        };

        if alerts.is_empty() {
            tracing::debug!("No alerts since last roll-up, skipping summary");
            return SinkOutcome::Skipped;
        }

        let caption = format_rollup(&counts, since, self.report_threshold);
        let outcome = SinkOutcome::from_result(
            "notification",
            notifier
                .notify_document(
                    &report_filename(Utc::now()),
                    &caption,
                    alerts_csv(&alerts).into_bytes(),
                )
                .await,
        );

        if outcome == SinkOutcome::Delivered {
            if let Ok(mut r) = self.rollup.lock() {
                // Alerts dispatched while the summary was in flight stay counted
                for (cat, n) in counts {
                    if let Some(current) = r.counts.get_mut(&cat) {
                        *current = current.saturating_sub(n);
                    }
                }
                r.counts.retain(|_, n| *n > 0);
                let sent = alerts.len().min(r.alerts.len());
                r.alerts.drain(..sent);
                r.since = Utc::now();
            }
            tracing::info!(alerts = alerts.len(), "Roll-up report sent");
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
        documents: Mutex<Vec<(String, String, String)>>,
        fail: AtomicBool,
    }

    impl RecordingNotifier {
        fn check(&self) -> Result<(), SinkError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SinkError::Status {
                    status: 429,
                    body: "Too Many Requests".into(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingNotifier {
        async fn notify(&self, message: &str) -> Result<(), SinkError> {
            self.check()?;
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }

        async fn notify_document(
            &self,
            filename: &str,
            caption: &str,
            body: Vec<u8>,
        ) -> Result<(), SinkError> {
            self.check()?;
            self.documents.lock().unwrap().push((
                filename.to_string(),
                caption.to_string(),
                String::from_utf8(body).unwrap(),
            ));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        rows: Mutex<Vec<AlertRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl AlertStore for RecordingStore {
        async fn append(&self, alert: &AlertRecord) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Io(std::io::Error::other("disk full")));
            }
            self.rows.lock().unwrap().push(alert.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }

    fn alert(category: Category) -> AlertRecord {
        AlertRecord {
            trade_fingerprint: format!("fp-{category}"),
            trader_id: "0xabc".into(),
            display_name: "0xabc".into(),
            usd_amount: Decimal::from(10_000),
            outcome_label: "Yes".into(),
            market_title: "m".into(),
            category,
            account_age_days: Some(1),
            activity_count: 0,
            token_id: None,
            dispatched_at: Utc::now(),
        }
    }

    fn politics_only() -> HashSet<Category> {
        [Category::Politics].into_iter().collect()
    }

    #[tokio::test]
    async fn test_policy_gate_routes_only_politics_to_chat() {
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(RecordingStore::default());
        let dispatcher = AlertDispatcher::new(politics_only())
            .with_notifier(notifier.clone())
            .with_store(store.clone());

        let crypto = dispatcher.dispatch(&alert(Category::Crypto)).await;
        assert_eq!(crypto.notification, SinkOutcome::Skipped);
        assert_eq!(crypto.store, SinkOutcome::Delivered);
        assert!(crypto.should_mark_sent());

        let politics = dispatcher.dispatch(&alert(Category::Politics)).await;
        assert_eq!(politics.notification, SinkOutcome::Delivered);

        assert_eq!(notifier.messages.lock().unwrap().len(), 1);
        assert_eq!(store.rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_notification_failure_blocks_mark_but_not_other_sinks() {
        let notifier = Arc::new(RecordingNotifier::default());
        notifier.fail.store(true, Ordering::SeqCst);
        let store = Arc::new(RecordingStore::default());
        let dispatcher = AlertDispatcher::new(politics_only())
            .with_notifier(notifier)
            .with_store(store.clone());

        let outcome = dispatcher.dispatch(&alert(Category::Politics)).await;
        assert!(outcome.notification.is_failed());
        assert_eq!(outcome.store, SinkOutcome::Delivered);
        assert!(!outcome.should_mark_sent());
        assert!(dispatcher.rollup_counts().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_does_not_block_mark() {
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(RecordingStore {
            rows: Mutex::new(vec![]),
            fail: true,
        });
        let dispatcher = AlertDispatcher::new(politics_only())
            .with_notifier(notifier.clone())
            .with_store(store);

        let outcome = dispatcher.dispatch(&alert(Category::Politics)).await;
        assert!(outcome.store.is_failed());
        assert_eq!(outcome.sheet, SinkOutcome::Disabled);
        assert!(outcome.should_mark_sent());
        assert_eq!(notifier.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rollup_counts_and_resets() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(politics_only())
            .with_notifier(notifier.clone())
            .with_report_threshold(Decimal::from(3_000));

        assert_eq!(dispatcher.send_rollup().await, SinkOutcome::Skipped);

        dispatcher.dispatch(&alert(Category::Politics)).await;
        dispatcher.dispatch(&alert(Category::Sports)).await;
        dispatcher.dispatch(&alert(Category::Sports)).await;

        let counts = dispatcher.rollup_counts();
        assert_eq!(counts.get(&Category::Sports), Some(&2));
        assert_eq!(counts.get(&Category::Politics), Some(&1));

        assert_eq!(dispatcher.send_rollup().await, SinkOutcome::Delivered);
        let documents = notifier.documents.lock().unwrap().clone();
        assert_eq!(documents.len(), 1);
        let (filename, caption, csv) = &documents[0];
        assert!(filename.ends_with(".csv"));
        assert!(caption.contains("Threshold: > $3000"));
        assert!(caption.contains("Total alerts: 3"));
        // Header plus one row per alert, sports ones included
        assert_eq!(csv.lines().count(), 4);
        assert!(csv.contains("token_outcome_name"));
        assert!(dispatcher.rollup_counts().is_empty());

        // Period reset: nothing left to report
        assert_eq!(dispatcher.send_rollup().await, SinkOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_rollup_failure_keeps_counts() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(HashSet::new()).with_notifier(notifier.clone());

        dispatcher.dispatch(&alert(Category::Crypto)).await;
        notifier.fail.store(true, Ordering::SeqCst);

        assert!(dispatcher.send_rollup().await.is_failed());
        assert_eq!(dispatcher.rollup_counts().get(&Category::Crypto), Some(&1));
    }

    #[tokio::test]
    async fn test_no_sinks_configured() {
        let dispatcher = AlertDispatcher::new(politics_only());
        let outcome = dispatcher.dispatch(&alert(Category::Politics)).await;
        assert_eq!(outcome.notification, SinkOutcome::Disabled);
        assert!(outcome.should_mark_sent());
        assert_eq!(dispatcher.send_rollup().await, SinkOutcome::Disabled);
    }
}
