//! Error types for web handlers.
//!
//! Bridges domain errors and HTTP responses by implementing Axum's
//! `IntoResponse` trait. Every error body has the shape
//! `{ "code": "...", "message": "..." }`, where `message` is safe to show
//! to the booker as-is.
//!
//! | Domain error                    | Status |
//! |---------------------------------|--------|
//! | `InvalidRequest`                | 422    |
//! | `EventNotFound`                 | 404    |
//! | `CapacityExceeded`              | 409    |
//! | `TransientConflict`             | 503    |
//! | `StorageUnavailable`            | 503    |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use weout_core::ReservationError;
use weout_runtime::CatalogError;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Event>, AppError> {
///     let event = catalog.get(id).await?;
///     Ok(Json(event))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "INVALID_REQUEST")
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }

    /// HTTP status of the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (for client error handling).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                );
            } else {
                tracing::warn!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Request failed"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        let status = match &err {
            ReservationError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ReservationError::EventNotFound(_) => StatusCode::NOT_FOUND,
            ReservationError::CapacityExceeded { .. } => StatusCode::CONFLICT,
            ReservationError::TransientConflict { .. }
            | ReservationError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let code = err.code();
        let app_error = Self::new(status, err.to_string(), code);
        if status.is_server_error() {
            app_error.with_source(anyhow::Error::new(err))
        } else {
            app_error
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Invalid(e) => Self::validation(e.to_string()),
            CatalogError::NotFound(id) => Self::new(
                StatusCode::NOT_FOUND,
                ReservationError::EventNotFound(id).to_string(),
                "EVENT_NOT_FOUND",
            ),
            CatalogError::Unavailable(_) => {
                Self::unavailable(err.to_string()).with_source(anyhow::Error::new(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weout_core::{EventId, ValidationError};

    #[test]
    fn test_error_display() {
        let err = AppError::validation("title must not be empty");
        assert_eq!(err.to_string(), "[INVALID_REQUEST] title must not be empty");
    }

    #[test]
    fn test_reservation_error_statuses() {
        let id = EventId::new();
        let cases = [
            (
                ReservationError::InvalidRequest(ValidationError::NonPositiveSeats(0)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ReservationError::EventNotFound(id), StatusCode::NOT_FOUND),
            (
                ReservationError::CapacityExceeded {
                    event_id: id,
                    requested: 2,
                    remaining: 1,
                },
                StatusCode::CONFLICT,
            ),
            (
                ReservationError::TransientConflict {
                    event_id: id,
                    attempts: 5,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ReservationError::StorageUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            let code = error.code();
            let app_error = AppError::from(error);
            assert_eq!(app_error.status(), status);
            assert_eq!(app_error.code(), code);
        }
    }

    #[test]
    fn test_catalog_not_found_uses_event_code() {
        let err = AppError::from(CatalogError::NotFound(EventId::new()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "EVENT_NOT_FOUND");
    }
}
