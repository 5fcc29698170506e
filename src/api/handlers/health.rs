use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::AppState;

/// Cycles missed before the scanner is reported stale.
const STALE_AFTER_INTERVALS: i64 = 3;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let last = state.last_cycle.read().await.clone();

    let Some(report) = last else {
        return (StatusCode::OK, Json(json!({ "status": "starting" })));
    };

    let max_age = state.config.scan_interval_secs as i64 * STALE_AFTER_INTERVALS;
    let stale = report
        .started_at
        .is_some_and(|at| (Utc::now() - at).num_seconds() > max_age);

    if stale {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "stale", "last_cycle": report })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "last_cycle": report })),
        )
    }
}
