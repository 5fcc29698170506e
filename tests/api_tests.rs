use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tower::ServiceExt;

use polywatch::api::router::create_router;
use polywatch::config::AppConfig;
use polywatch::ingestion::CycleReport;
use polywatch::models::Category;
use polywatch::AppState;

fn test_config() -> AppConfig {
    AppConfig {
        data_api_url: "http://localhost:1".into(),
        gamma_api_url: "http://localhost:1".into(),
        http_timeout_secs: 1,
        min_bet_usd: Decimal::from(3_000),
        feed_page_limit: 500,
        backfill_max_pages: 20,
        profiler_page_size: 100,
        profiler_max_pages: 3,
        max_account_age_days: 10,
        min_activity_count: 10,
        category_keywords_path: None,
        telegram_bot_token: None,
        telegram_chat_id: None,
        notifications_enabled: false,
        notify_categories: [Category::Politics].into_iter().collect(),
        database_url: None,
        alert_log_path: PathBuf::from("alerts.jsonl"),
        sheet_webhook_url: None,
        ledger_path: PathBuf::from("sent_trades.json"),
        ledger_retention_days: 7,
        lock_path: PathBuf::from("polywatch.lock"),
        lock_stale_secs: 900,
        dispatch_delay_ms: 0,
        scan_interval_secs: 300,
        rollup_interval_secs: 86_400,
        host: "127.0.0.1".into(),
        http_port: None,
    }
}

fn build_test_app(last_cycle: Option<CycleReport>) -> axum::Router {
    // A local recorder: installing a global one would clash across tests
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

    let state = AppState {
        config: test_config(),
        metrics_handle,
        last_cycle: Arc::new(RwLock::new(last_cycle)),
    };
    create_router(state)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_before_first_cycle() {
    let (status, body) = get(build_test_app(None), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "starting");
}

#[tokio::test]
async fn test_health_reports_last_cycle() {
    let report = CycleReport {
        started_at: Some(Utc::now()),
        fetched: 12,
        alerted: 2,
        ..Default::default()
    };
    let (status, body) = get(build_test_app(Some(report)), "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["last_cycle"]["fetched"], 12);
    assert_eq!(json["last_cycle"]["alerted"], 2);
}

#[tokio::test]
async fn test_health_stale_when_cycles_stop() {
    let report = CycleReport {
        started_at: Some(Utc::now() - Duration::hours(2)),
        ..Default::default()
    };
    let (status, body) = get(build_test_app(Some(report)), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("stale"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (status, _) = get(build_test_app(None), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
}
