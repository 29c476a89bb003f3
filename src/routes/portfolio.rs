use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    services::portfolio::{
        abc_summary, dashboard_rows, new_activations, portfolio_kpis, priority_ranking,
        revenue_by_client, AbcSummary, ActivationBuckets, DashboardRow, PortfolioKpis,
        PriorityEntry, RevenueShare,
    },
    AppState,
};

const DEFAULT_PRIORITY_LIMIT: usize = 10;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/portfolio/priority", get(priority))
        .route("/portfolio/revenue", get(revenue))
        .route("/portfolio/summary", get(summary))
        .route("/dashboard", get(dashboard))
}

#[derive(Debug, Serialize)]
pub struct PortfolioSummary {
    pub kpis: PortfolioKpis,
    pub abc: AbcSummary,
    pub new_activations: ActivationBuckets,
}

#[derive(Debug, Deserialize)]
pub struct PriorityParams {
    limit: Option<usize>,
}

async fn priority(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PriorityParams>,
) -> Result<Json<Vec<PriorityEntry>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_PRIORITY_LIMIT);
    if limit == 0 {
        return Err(AppError::InvalidInput("limit must be at least 1".to_string()));
    }
    let snapshot = state.snapshot().await?;
    Ok(Json(priority_ranking(&snapshot.clients, &snapshot.tickets, limit)))
}

async fn revenue(State(state): State<Arc<AppState>>) -> Result<Json<Vec<RevenueShare>>, AppError> {
    let snapshot = state.snapshot().await?;
    Ok(Json(revenue_by_client(&snapshot.clients)))
}

async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<PortfolioSummary>, AppError> {
    let snapshot = state.snapshot().await?;
    Ok(Json(PortfolioSummary {
        kpis: portfolio_kpis(&snapshot.clients),
        abc: abc_summary(&revenue_by_client(&snapshot.clients)),
        new_activations: new_activations(&snapshot.clients, snapshot.loaded_at.date()),
    }))
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Json<Vec<DashboardRow>>, AppError> {
    let snapshot = state.snapshot().await?;
    Ok(Json(dashboard_rows(&snapshot.clients, &snapshot.tickets)))
}
