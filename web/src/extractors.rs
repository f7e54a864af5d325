//! Custom Axum extractors.
//!
//! - `Json`: JSON request body whose rejections are rendered as
//!   `{ "code", "message" }` bodies instead of axum's plain-text ones
//!
//! # Examples
//!
//! ```ignore
//! use weout_web::extractors::Json;
//!
//! async fn handler(Json(input): Json<NewEvent>) -> Result<axum::Json<EventView>, AppError> {
//!     // ...
//! }
//! ```

use crate::error::AppError;
use axum::extract::FromRequest;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

/// JSON request body.
///
/// Malformed JSON, missing fields, wrong types and values rejected by a
/// type's `Deserialize` impl (such as a zero capacity) are all reported as
/// 422 `INVALID_REQUEST`.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => Self::validation(e.body_text()),
            JsonRejection::JsonSyntaxError(e) => Self::validation(e.body_text()),
            JsonRejection::MissingJsonContentType(e) => Self::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                e.body_text(),
                "UNSUPPORTED_MEDIA_TYPE",
            ),
            other => Self::new(other.status(), other.body_text(), "INVALID_REQUEST"),
        }
    }
}
