use timelock_settlement::api::router::create_router;
use timelock_settlement::config::AppConfig;
use timelock_settlement::services::unlock_watcher::run_unlock_watcher;
use timelock_settlement::store::{fixtures, legacy, MemoryStore, Store};
use timelock_settlement::{db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    let addr = format!("{}:{}", config.host, config.port);

    let store = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url).await?;
            db::run_migrations(&pool).await?;
            tracing::info!("Database connected, migrations applied");
            Store::Postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Store::Memory(MemoryStore::new())
        }
    };

    let state = AppState::new(config, store);

    // --- Startup data ---
    if let Some(path) = &state.config.legacy_snapshot_path {
        let snapshot = legacy::load_snapshot(path).await?;
        let summary =
            legacy::import_snapshot(&state.store, &snapshot, state.config.unit_scale).await?;
        tracing::info!(
            path = %path,
            markets = summary.markets,
            stakes = summary.stakes,
            skipped_stakes = summary.skipped_stakes,
            rewarded_stakers = summary.rewarded_stakers,
            "Legacy snapshot imported"
        );
    }

    if state.config.seed_demo_markets {
        let seeded = fixtures::seed_demo_markets(&state.store, &state.rules).await?;
        tracing::info!(count = seeded.len(), "Demo markets seeded");
    }

    // --- Background services ---
    if state.config.unlock_watch_interval_secs > 0 {
        let store = state.store.clone();
        let ws_tx = state.ws_tx.clone();
        let interval_secs = state.config.unlock_watch_interval_secs;
        tokio::spawn(async move {
            run_unlock_watcher(store, ws_tx, interval_secs).await;
        });
        tracing::info!(interval_secs, "Unlock watcher spawned");
    } else {
        tracing::info!("Unlock watcher disabled (UNLOCK_WATCH_INTERVAL_SECS=0)");
    }

    tracing::info!(
        store = state.store.backend_name(),
        unit_scale = state.config.unit_scale.decimals(),
        min_stake = %state.config.min_stake,
        auth = state.config.api_token.is_some(),
        "Settlement service configured"
    );

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
