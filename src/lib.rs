pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod polymarket;
pub mod services;

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::ingestion::CycleReport;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    /// Summary of the most recent completed scan cycle.
    pub last_cycle: Arc<RwLock<Option<CycleReport>>>,
}
