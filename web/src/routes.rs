//! Router configuration.

use crate::handlers::{events, health, reservations, tickets};
use crate::middleware::request_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete Axum router.
///
/// Routes:
/// - `GET /health`, `GET /ready`, `GET /metrics`
/// - `POST /events`, `GET /events`, `GET /events/:id`
/// - `POST /events/:id/reservations`
/// - `GET /events/:id/tickets`, `GET /bookers/:uid/tickets`
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/events", post(events::create_event).get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/reservations", post(reservations::reserve))
        .route("/events/:id/tickets", get(tickets::event_tickets))
        .route("/bookers/:uid/tickets", get(tickets::booker_tickets))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
