use axum::extract::{Path, State};
use axum::Json;
use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::api::ws_types::{RewardsClaimedData, WsMessage};
use crate::errors::AppError;
use crate::AppState;

use super::ApiResponse;

#[derive(Serialize)]
pub struct RewardBalance {
    pub staker: String,
    pub balance: Decimal,
}

#[derive(Serialize)]
pub struct ClaimResult {
    pub staker: String,
    pub amount: Decimal,
}

/// GET /api/rewards/:staker: claimable balance (zero when nothing is owed)
pub async fn balance(
    State(state): State<AppState>,
    Path(staker): Path<String>,
) -> Result<Json<ApiResponse<RewardBalance>>, AppError> {
    let balance = state.store.reward_balance(&staker).await?;
    Ok(Json(ApiResponse::ok(RewardBalance { staker, balance })))
}

/// POST /api/rewards/:staker/claim: zero the balance and return what was owed
pub async fn claim(
    State(state): State<AppState>,
    Path(staker): Path<String>,
) -> Result<Json<ApiResponse<ClaimResult>>, AppError> {
    let amount = state.store.claim_rewards(&staker).await?;

    if amount > Decimal::ZERO {
        counter!("rewards_claimed_total").increment(1);
        tracing::info!(staker = %staker, amount = %amount, "Rewards claimed");
        let _ = state.ws_tx.send(WsMessage::RewardsClaimed(RewardsClaimedData {
            staker: staker.clone(),
            amount,
        }));
    }

    Ok(Json(ApiResponse::ok(ClaimResult { staker, amount })))
}
