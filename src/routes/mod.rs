use std::sync::Arc;

use axum::{routing::get, Router};

use crate::AppState;

pub mod clients;
pub mod portfolio;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .merge(clients::routes())
        .merge(portfolio::routes())
}

async fn health_check() -> &'static str {
    "OK"
}
