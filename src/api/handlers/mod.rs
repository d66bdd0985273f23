use serde::Serialize;

pub mod health;
pub mod markets;
pub mod metrics;
pub mod rewards;
pub mod stats;
pub mod ws;

/// Success envelope shared by the JSON endpoints. Errors use the same
/// `success`/`error` shape through [`crate::errors::AppError`].
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
