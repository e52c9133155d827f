use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use spill_shared::errors::AppResult;
use spill_shared::middleware::AdminUser;
use spill_shared::types::ApiResponse;

use crate::services::analytics::{self, Analytics};
use crate::AppState;

pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<Analytics>>> {
    let mut conn = state.conn()?;
    let report = analytics::load(&mut conn, Utc::now())?;
    Ok(Json(ApiResponse::ok(report)))
}
