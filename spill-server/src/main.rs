use std::net::SocketAddr;
use std::sync::Arc;

use spill_server::config::AppConfig;
use spill_server::realtime::EventBus;
use spill_server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spill_shared::middleware::init_tracing("spill-server");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = spill_shared::clients::create_pool(&config.database_url, config.db_pool_size)?;
    let metrics_handle = spill_shared::middleware::init_metrics()?;
    let bus = EventBus::with_capacity(config.event_buffer);

    let state = Arc::new(AppState { db, config, bus, metrics_handle });
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "spill-server starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
