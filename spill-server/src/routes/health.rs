use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::RunQueryDsl;
use std::sync::Arc;

use spill_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

fn database_check(state: &AppState) -> HealthCheck {
    let mut conn = match state.db.get() {
        Ok(conn) => conn,
        Err(e) => return HealthCheck::down("database", e.to_string()),
    };
    match diesel::sql_query("SELECT 1").execute(&mut conn) {
        Ok(_) => HealthCheck::up("database"),
        Err(e) => HealthCheck::down("database", e.to_string()),
    }
}

/// Service status plus a database round trip.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let checks = vec![database_check(&state)];
    let response = HealthResponse::healthy("spill-server", env!("CARGO_PKG_VERSION")).with_checks(checks);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
