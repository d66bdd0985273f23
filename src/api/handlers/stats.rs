use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::models::MarketStats;
use crate::AppState;

use super::ApiResponse;

/// GET /api/stats
pub async fn summary(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MarketStats>>, AppError> {
    let stats = state.store.stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}
