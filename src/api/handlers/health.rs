use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.store.backend_name();

    if state.store.ping().await {
        (StatusCode::OK, Json(json!({ "status": "healthy", "store": backend })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "store": backend, "db": "disconnected" })),
        )
    }
}
