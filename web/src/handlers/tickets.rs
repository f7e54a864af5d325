//! Ticket query endpoints.
//!
//! - `GET /events/{id}/tickets`: tickets of one event, oldest first
//! - `GET /bookers/{uid}/tickets`: "My Tickets", newest first

use crate::error::AppError;
use crate::handlers::events::parse_event_id;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use weout_core::Ticket;

/// Tickets of one event.
///
/// # Errors
///
/// - 404: no such event
/// - 503: store unavailable
pub async fn event_tickets(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    let event_id = parse_event_id(&id)?;
    let tickets = state.reservations.tickets_for_event(event_id).await?;
    Ok(Json(tickets))
}

/// Tickets of one booker.
///
/// # Errors
///
/// - 503: store unavailable
pub async fn booker_tickets(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    let tickets = state.reservations.tickets_for_booker(&uid).await?;
    Ok(Json(tickets))
}
