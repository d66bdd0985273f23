use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::market::MarketError;
use crate::settlement::SettlementError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".into()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<MarketError> for AppError {
    fn from(e: MarketError) -> Self {
        match e {
            MarketError::NotFound(_) => AppError::NotFound(e.to_string()),
            MarketError::AlreadySettled(_) | MarketError::StakingClosed { .. } => {
                AppError::Conflict(e.to_string())
            }
            MarketError::BelowMinimum { .. }
            | MarketError::InvalidQuestion { .. }
            | MarketError::UnlockTooSoon { .. } => AppError::BadRequest(e.to_string()),
            MarketError::Settlement(inner) => inner.into(),
            MarketError::Storage(inner) => AppError::Internal(inner),
        }
    }
}

impl From<SettlementError> for AppError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::InvalidStake { .. } | SettlementError::InvalidOutcome(_) => {
                AppError::BadRequest(e.to_string())
            }
            SettlementError::PoolOverflow => AppError::Internal(e.into()),
        }
    }
}
