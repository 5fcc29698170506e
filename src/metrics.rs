use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

/// Pre-register metrics so they appear even before the first increment.
pub fn register_metrics() {
    counter!("trades_scanned_total", "outcome" => "alerted").absolute(0);
    counter!("alerts_dispatched_total", "category" => "politics").absolute(0);
    counter!("sink_failures_total", "sink" => "notification").absolute(0);

    // Histogram is lazily created on first record; force creation.
    histogram!("scan_cycle_seconds").record(0.0);
}
