use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics::gauge;

use crate::AppState;

/// Prometheus scrape. The open-market gauge is refreshed from the store first
/// so it stays accurate when the unlock watcher is disabled.
pub async fn render(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.stats().await {
        Ok(stats) => gauge!("open_markets").set(stats.open_markets as f64),
        Err(e) => tracing::warn!(error = %e, "Failed to refresh market gauges"),
    }

    let body = state.metrics_handle.render();
    ([(CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
