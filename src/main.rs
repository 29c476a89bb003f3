use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{http::Method, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use cs_health_services::{config, logging, routes, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    let addr = config.bind_addr;
    tracing::info!("Serving workbook {}", config.workbook_path.display());

    let state = Arc::new(AppState::new(config));

    // Warm the cache so the first request does not pay for the parse
    let snapshot = state.snapshot().await?;
    tracing::info!(
        "Loaded {} clients and {} ticket rows",
        snapshot.clients.len(),
        snapshot.tickets.len()
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    let app = Router::new()
        .merge(routes::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
