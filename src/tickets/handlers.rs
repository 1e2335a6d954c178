use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use super::error::TicketsError;
use super::filter::{ListQuery, TicketFilter};
use super::stats::{aggregate, TicketStats};
use super::types::{
    Classification, ClassifyRequest, CreateTicketRequest, NewTicket, Ticket, TicketPatch,
    UpdateTicketRequest,
};
use crate::core::shared::state::AppState;

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Ticket>>, TicketsError> {
    let filter = TicketFilter::from(query);
    let tickets = state.tickets.filter(&filter).await?;
    Ok(Json(tickets))
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Ticket>), TicketsError> {
    let Json(req) = payload?;
    let ticket = state.tickets.insert(NewTicket::try_from(req)?).await?;
    info!("Created ticket {} {}", ticket.id, ticket);
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Ticket>, TicketsError> {
    let Path(id) = path?;
    Ok(Json(state.tickets.get(id).await?))
}

pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateTicketRequest>, JsonRejection>,
) -> Result<Json<Ticket>, TicketsError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let patch = TicketPatch::try_from(req)?;
    let ticket = state.tickets.update(id, patch).await?;
    Ok(Json(ticket))
}

pub async fn get_ticket_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TicketStats>, TicketsError> {
    let tickets = state.tickets.query_all().await?;
    Ok(Json(aggregate(&tickets)))
}

pub async fn classify_ticket(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<Classification>, TicketsError> {
    let Json(req) = payload?;
    if req.description.trim().is_empty() {
        return Err(TicketsError::Validation(
            "description is required".to_string(),
        ));
    }
    Ok(Json(state.classifier.classify(&req.description).await))
}
