use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        ClientRecord, HealthComponents, HealthLabel, IncidentProfile, SourceStatus, TicketRecord,
    },
    services::{
        health_score::compute_health_score, incident_profile::classify_incidents,
        portfolio::{suggest_actions, tickets_for_client, ActionSuggestion},
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/clients", get(list_clients))
        .route("/clients/:name/health", get(client_health))
        .route("/tickets", get(list_tickets))
        .route("/reload", post(reload))
}

#[derive(Debug, Serialize)]
pub struct ClientHealthResponse {
    pub client: String,
    pub score: u8,
    pub label: HealthLabel,
    pub components: HealthComponents,
    pub incident_profile: IncidentProfile,
    pub suggestions: Vec<ActionSuggestion>,
    pub ticket_rows: usize,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub clients: usize,
    pub tickets: usize,
    pub clients_status: SourceStatus,
    pub tickets_status: SourceStatus,
    pub ticket_sheets: Vec<String>,
    pub loaded_at: NaiveDateTime,
}

async fn list_clients(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ClientRecord>>, AppError> {
    let snapshot = state.snapshot().await?;
    Ok(Json(snapshot.clients.clone()))
}

async fn list_tickets(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TicketRecord>>, AppError> {
    let snapshot = state.snapshot().await?;
    Ok(Json(snapshot.tickets.clone()))
}

async fn client_health(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ClientHealthResponse>, AppError> {
    let snapshot = state.snapshot().await?;
    let client = snapshot
        .find_client(&name)
        .ok_or_else(|| AppError::NotFound(format!("client '{}'", name.trim())))?;

    let tickets = tickets_for_client(&snapshot.tickets, &client.name);
    let health = compute_health_score(client, &tickets);

    Ok(Json(ClientHealthResponse {
        client: client.name.clone(),
        score: health.score,
        label: HealthLabel::from_score(health.score),
        components: health.components,
        incident_profile: classify_incidents(&tickets),
        suggestions: suggest_actions(client, &tickets),
        ticket_rows: tickets.len(),
    }))
}

async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<ReloadResponse>, AppError> {
    tracing::info!("Reloading workbook {}", state.config.workbook_path.display());
    let snapshot = state.reload().await?;

    Ok(Json(ReloadResponse {
        clients: snapshot.clients.len(),
        tickets: snapshot.tickets.len(),
        clients_status: snapshot.clients_status.clone(),
        tickets_status: snapshot.tickets_status.clone(),
        ticket_sheets: snapshot.ticket_sheets.clone(),
        loaded_at: snapshot.loaded_at,
    }))
}
