//! Reservation endpoint.
//!
//! `POST /events/{id}/reservations` books seats and returns the ticket.
//! The response is only sent once the ticket is durable; there is no
//! pending state to poll.

use crate::error::AppError;
use crate::extractors::Json as JsonBody;
use crate::handlers::events::parse_event_id;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use weout_core::{Booker, Ticket};

/// Request to reserve seats.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReserveRequest {
    /// Seats requested. Signed so that zero and negative requests reach
    /// validation and are reported as 422.
    pub seats: i64,
    /// Who is booking
    pub booker: Booker,
}

/// Reserve seats of an event.
///
/// ```bash
/// curl -X POST http://localhost:8080/events/550e8400-e29b-41d4-a716-446655440000/reservations \
///   -H "Content-Type: application/json" \
///   -d '{"seats":2,"booker":{"uid":"u-1","name":"Achieng","email":"achieng@example.com"}}'
/// ```
///
/// # Errors
///
/// - 404: no such event
/// - 409: not enough seats remain
/// - 422: malformed body, seats < 1, missing or blank booker uid
/// - 503: contention or storage failure; safe to retry
pub async fn reserve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<ReserveRequest>,
) -> Result<(StatusCode, Json<Ticket>), AppError> {
    let event_id = parse_event_id(&id)?;
    let ticket = state
        .reservations
        .reserve(event_id, request.seats, request.booker)
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}
