pub mod config;
pub mod device;
pub mod export;
pub mod identity;
pub mod models;
pub mod ranking;
pub mod realtime;
pub mod routes;
pub mod schema;
pub mod services;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use spill_shared::clients::DbPool;
use spill_shared::errors::{AppError, AppResult};
use spill_shared::middleware::{metrics_middleware, JwtSecretProvider};
use spill_shared::types::ChangeEvent;

use config::AppConfig;
use realtime::EventBus;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub bus: EventBus,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl AppState {
    pub fn conn(&self) -> AppResult<spill_shared::clients::DbConn> {
        self.db
            .get()
            .map_err(|e| AppError::internal(format!("db pool error: {e}")))
    }

    /// Publish a change once its transaction has committed.
    pub fn publish(&self, event: ChangeEvent) {
        self.bus.emit(event);
    }
}

impl JwtSecretProvider for AppState {
    fn jwt_secret(&self) -> &str {
        &self.config.jwt_secret
    }
}

fn cors(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .origins()
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT, identity::IDENTITY_HEADER])
        .expose_headers([identity::IDENTITY_HEADER, header::CONTENT_DISPOSITION]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/confessions", get(routes::admin::list_confessions))
        .route("/confessions/bulk-delete", post(routes::admin::bulk_delete_confessions))
        .route("/confessions/:id", delete(routes::admin::delete_confession))
        .route("/reports", get(routes::admin::list_reports))
        .route("/reports/:id", delete(routes::admin::dismiss_report))
        .route("/analytics", get(routes::analytics::get_analytics))
        .route("/export/confessions.csv", get(routes::export::export_confessions))
        .route("/export/reports.csv", get(routes::export::export_reports))
        .route("/export/analytics.csv", get(routes::export::export_analytics));

    let confession_routes = Router::new()
        .route("/", get(routes::confessions::list_confessions).post(routes::confessions::create_confession))
        .route("/by-slug/:slug", get(routes::confessions::get_confession_by_slug))
        .route("/:id", get(routes::confessions::get_confession))
        .route("/:id/vote", post(routes::votes::cast_vote))
        .route("/:id/votes", get(routes::votes::get_votes))
        .route("/:id/comments", get(routes::comments::list_comments).post(routes::comments::create_comment))
        .route("/:id/reports", post(routes::reports::create_report));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/auth/login", post(routes::auth::login))
        .route("/trending", get(routes::trending::get_trending))
        .route("/tags", get(routes::trending::get_tags))
        .route("/events", get(realtime::sse::stream_events))
        .nest("/confessions", confession_routes)
        .nest("/admin", admin_routes)
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(cors(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::PgConnection;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::time::Duration;

    /// State whose pool points at a closed port; handlers that reach the
    /// database fail fast, everything before that is exercised for real.
    pub fn state() -> Arc<AppState> {
        let manager = ConnectionManager::<PgConnection>::new("postgres://spill@127.0.0.1:1/spill");
        let db = Pool::builder()
            .max_size(1)
            .min_idle(Some(0))
            .connection_timeout(Duration::from_millis(250))
            .build_unchecked(manager);

        Arc::new(AppState {
            db,
            config: AppConfig { jwt_secret: "test-secret".into(), ..AppConfig::default() },
            bus: EventBus::default(),
            metrics_handle: PrometheusBuilder::new().build_recorder().handle(),
        })
    }
}
