use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Bearer token required when API_TOKEN is set
    let protected = Router::new()
        // Markets
        .route("/api/markets", get(handlers::markets::list).post(handlers::markets::create))
        .route("/api/markets/:id", get(handlers::markets::detail))
        .route(
            "/api/markets/:id/stakes",
            get(handlers::markets::stakes).post(handlers::markets::place_stake),
        )
        .route("/api/markets/:id/resolve", post(handlers::markets::resolve))
        // Rewards
        .route("/api/rewards/:staker", get(handlers::rewards::balance))
        .route("/api/rewards/:staker/claim", post(handlers::rewards::claim))
        // Stats
        .route("/api/stats", get(handlers::stats::summary))
        // WebSocket
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // The front-end is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
