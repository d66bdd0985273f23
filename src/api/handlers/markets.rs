use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ws_types::{StakePlacedData, WsMessage};
use crate::errors::AppError;
use crate::models::{Market, NewMarket, Side, Stake};
use crate::services::settlement::resolve_and_settle;
use crate::settlement::{parse_outcome, SettlementReport};
use crate::AppState;

use super::ApiResponse;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateMarketRequest {
    pub creator: String,
    pub question: String,
    pub category: Option<String>,
    /// Unix seconds.
    pub unlock_time: i64,
    /// Side the creator backs at creation; no stake is placed when absent.
    pub initial_side: Option<Side>,
    /// Defaults to the minimum stake.
    pub initial_stake: Option<Decimal>,
}

#[derive(Deserialize)]
pub struct PlaceStakeRequest {
    pub staker: String,
    pub side: Side,
    pub amount: Decimal,
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub outcome: Value,
}

#[derive(Serialize)]
pub struct MarketDetail {
    #[serde(flatten)]
    pub market: Market,
    pub total_pool: Decimal,
    pub stake_count: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/markets: all markets, newest first
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Market>>>, AppError> {
    let markets = state.store.list_markets().await?;
    Ok(Json(ApiResponse::ok(markets)))
}

/// POST /api/markets: create a market, optionally with the creator's first stake
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateMarketRequest>,
) -> Result<Json<ApiResponse<Market>>, AppError> {
    let unlock_time = DateTime::<Utc>::from_timestamp(body.unlock_time, 0)
        .ok_or_else(|| AppError::BadRequest(format!("invalid unlock_time {}", body.unlock_time)))?;

    let new = NewMarket {
        creator: body.creator,
        question: body.question,
        category: body.category.unwrap_or_else(|| "other".into()),
        unlock_time,
    };

    let initial_stake = body.initial_side.map(|side| {
        let amount = body.initial_stake.unwrap_or(state.rules.min_stake);
        Stake::new(new.creator.clone(), side, amount)
    });

    let market = match &initial_stake {
        Some(stake) => {
            state
                .store
                .create_market_with_stake(&new, stake.clone(), &state.rules)
                .await?
        }
        None => state.store.create_market(&new, &state.rules).await?,
    };
    counter!("markets_created_total").increment(1);
    gauge!("open_markets").increment(1.0);
    tracing::info!(
        market_id = market.id,
        creator = %market.creator,
        unlock_time = %market.unlock_time,
        "Market created"
    );

    if let Some(stake) = initial_stake {
        stake_placed(&state, &market, stake);
    }

    let _ = state.ws_tx.send(WsMessage::MarketCreated(market.clone()));
    Ok(Json(ApiResponse::ok(market)))
}

/// GET /api/markets/:id: market detail with pool totals
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MarketDetail>>, AppError> {
    let market = state.store.get_market(id).await?;
    let stake_count = state.store.stakes_for_market(id).await?.len();

    Ok(Json(ApiResponse::ok(MarketDetail {
        total_pool: market.total_pool(),
        market,
        stake_count,
    })))
}

/// GET /api/markets/:id/stakes: stakes not yet consumed by settlement
pub async fn stakes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Stake>>>, AppError> {
    let stakes = state.store.stakes_for_market(id).await?;
    Ok(Json(ApiResponse::ok(stakes)))
}

/// POST /api/markets/:id/stakes: stake on an open market
pub async fn place_stake(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PlaceStakeRequest>,
) -> Result<Json<ApiResponse<Market>>, AppError> {
    if body.staker.trim().is_empty() {
        return Err(AppError::BadRequest("staker must not be empty".into()));
    }
    let stake = Stake::new(body.staker.trim(), body.side, body.amount);
    let market = place(&state, id, stake).await?;
    Ok(Json(ApiResponse::ok(market)))
}

/// POST /api/markets/:id/resolve: declare the outcome and settle
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<ApiResponse<SettlementReport>>, AppError> {
    let winning_side = parse_outcome(&body.outcome)?;
    let report =
        resolve_and_settle(&state.store, &state.engine, &state.ws_tx, id, winning_side).await?;
    Ok(Json(ApiResponse::ok(report)))
}

async fn place(state: &AppState, market_id: i64, stake: Stake) -> Result<Market, AppError> {
    let market = state.store.place_stake(market_id, stake.clone(), &state.rules).await?;
    stake_placed(state, &market, stake);
    Ok(market)
}

fn stake_placed(state: &AppState, market: &Market, stake: Stake) {
    counter!("stakes_placed_total").increment(1);
    tracing::info!(
        market_id = market.id,
        staker = %stake.staker,
        side = %stake.side,
        amount = %stake.amount,
        "Stake placed"
    );

    let _ = state.ws_tx.send(WsMessage::StakePlaced(StakePlacedData {
        market_id: market.id,
        staker: stake.staker,
        side: stake.side,
        amount: stake.amount,
        yes_pool: market.yes_pool,
        no_pool: market.no_pool,
    }));
}
