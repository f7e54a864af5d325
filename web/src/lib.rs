//! Axum HTTP API for weOut.
//!
//! Thin imperative shell over the runtime services: handlers parse the
//! request, call [`weout_runtime::ReservationService`] or
//! [`weout_runtime::EventCatalog`], and map the typed outcome to a status
//! code and JSON body.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at Axum handler
//! 2. **Extract data** from request (path, query, JSON)
//! 3. **Call** the service
//! 4. **Map result** to HTTP response (see [`error`] for the status table)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use weout_web::{AppState, build_router};
//!
//! let state = AppState::new(store, clock, RetryPolicy::default());
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use middleware::{REQUEST_ID_HEADER, RequestId, request_id_layer};
pub use routes::build_router;
pub use state::AppState;
