//! Event catalog endpoints.
//!
//! - `POST /events`: publish an event
//! - `GET /events`: list events, filtered by query parameters
//! - `GET /events/{id}`: fetch one event

use crate::error::AppError;
use crate::extractors::Json as JsonBody;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use weout_core::{Category, Event, EventFilter, EventId, NewEvent, Price};

// ============================================================================
// Request/Response Types
// ============================================================================

/// An event as returned by the API, with derived availability.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventView {
    /// The stored event
    #[serde(flatten)]
    pub event: Event,
    /// Seats still available
    pub remaining: u32,
    /// Whether no seats remain
    pub sold_out: bool,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        Self {
            remaining: event.remaining(),
            sold_out: event.is_sold_out(),
            event,
        }
    }
}

/// Query parameters of `GET /events`.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    /// Category name, case-insensitive
    pub category: Option<String>,
    /// Substring of title, location or area
    pub search: Option<String>,
    /// Inclusive lower price bound
    pub min_price: Option<u64>,
    /// Inclusive upper price bound
    pub max_price: Option<u64>,
    /// Inclusive earliest date (YYYY-MM-DD)
    pub from: Option<NaiveDate>,
    /// Inclusive latest date (YYYY-MM-DD)
    pub to: Option<NaiveDate>,
}

impl ListEventsQuery {
    fn into_filter(self) -> Result<EventFilter, AppError> {
        let category = self
            .category
            .filter(|c| !c.trim().is_empty() && !c.eq_ignore_ascii_case("all"))
            .map(|c| c.parse::<Category>())
            .transpose()
            .map_err(|e| AppError::validation(e.to_string()))?;

        Ok(EventFilter {
            category,
            search: self.search,
            min_price: self.min_price.map(Price::new),
            max_price: self.max_price.map(Price::new),
            from: self.from,
            to: self.to,
        })
    }
}

/// Parse an event ID path segment. An unparseable ID names no event.
pub(crate) fn parse_event_id(raw: &str) -> Result<EventId, AppError> {
    raw.parse::<EventId>()
        .map_err(|_| AppError::new(StatusCode::NOT_FOUND, format!("Event {raw} was not found."), "EVENT_NOT_FOUND"))
}

// ============================================================================
// Handlers
// ============================================================================

/// Publish a new event.
///
/// ```bash
/// curl -X POST http://localhost:8080/events \
///   -H "Content-Type: application/json" \
///   -d '{"title":"Sol Fest","category":"Music","date":"2026-12-12",
///        "price":3500,"capacity":500,"organizer":"Sol Generation",
///        "organizer_uid":"org-1"}'
/// ```
///
/// # Errors
///
/// - 422: malformed body, zero capacity, blank title or organizer uid
/// - 503: store unavailable
pub async fn create_event(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NewEvent>,
) -> Result<(StatusCode, Json<EventView>), AppError> {
    let event = state.catalog.publish(input).await?;
    Ok((StatusCode::CREATED, Json(event.into())))
}

/// List events ordered by date, then title.
///
/// ```bash
/// curl "http://localhost:8080/events?category=music&search=westlands&max_price=2000"
/// ```
///
/// # Errors
///
/// - 422: unknown category
/// - 503: store unavailable
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<EventView>>, AppError> {
    let filter = query.into_filter()?;
    let events = state.catalog.list(&filter).await?;
    Ok(Json(events.into_iter().map(EventView::from).collect()))
}

/// Fetch one event.
///
/// # Errors
///
/// - 404: no such event
/// - 503: store unavailable
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EventView>, AppError> {
    let event_id = parse_event_id(&id)?;
    let event = state.catalog.get(event_id).await?;
    Ok(Json(event.into()))
}
