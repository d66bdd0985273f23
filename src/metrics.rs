use std::sync::OnceLock;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload. Later calls return the same handle.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            // Pre-register counters so they appear even before the first increment.
            counter!("markets_created_total").absolute(0);
            counter!("stakes_placed_total").absolute(0);
            counter!("markets_settled_total").absolute(0);
            counter!("settlement_failures_total").absolute(0);
            counter!("rewards_claimed_total").absolute(0);

            gauge!("open_markets").set(0.0);

            // Histogram is lazily created on first record; force creation.
            histogram!("settlement_payout_count").record(0.0);

            handle
        })
        .clone()
}
