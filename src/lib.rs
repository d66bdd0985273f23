pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod market;
pub mod metrics;
pub mod models;
pub mod services;
pub mod settlement;
pub mod store;

use tokio::sync::broadcast;

use crate::api::ws_types::WsMessage;
use crate::config::AppConfig;
use crate::market::MarketRules;
use crate::settlement::SettlementEngine;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub engine: SettlementEngine,
    pub rules: MarketRules,
    pub config: AppConfig,
    pub ws_tx: broadcast::Sender<WsMessage>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl AppState {
    /// Build the shared state from a config and an already-connected store.
    pub fn new(config: AppConfig, store: Store) -> Self {
        let (ws_tx, _) = broadcast::channel::<WsMessage>(256);
        Self {
            store,
            engine: SettlementEngine::new(config.unit_scale),
            rules: config.market_rules(),
            config,
            ws_tx,
            metrics_handle: crate::metrics::init_metrics(),
        }
    }
}
