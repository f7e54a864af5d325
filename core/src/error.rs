//! Typed outcomes of a reservation attempt.
//!
//! `reserve` never panics and never swallows a failure: every way it can
//! fail is one of the [`ReservationError`] variants below, each carrying a
//! message suitable for showing directly to the booker.

use crate::types::EventId;
use thiserror::Error;

/// Input validation failures. Raised before storage is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Requested seat count was zero or negative.
    #[error("Seat count must be at least 1 (got {0})")]
    NonPositiveSeats(i64),

    /// Requested seat count does not fit a seat counter.
    #[error("Seat count {0} is too large")]
    TooManySeats(i64),

    /// Event capacity was zero.
    #[error("Capacity must be at least 1")]
    ZeroCapacity,

    /// A required text field was blank.
    #[error("{0} must not be empty")]
    Blank(&'static str),

    /// seats × price does not fit in a price.
    #[error("Total price overflows for {seats} seats at {unit_price} each")]
    PriceOverflow {
        /// Seats requested
        seats: u32,
        /// Unit price of the event
        unit_price: u64,
    },
}

/// Errors returned by `ReservationService::reserve`.
///
/// # Retry Guidance
///
/// | Variant              | Retry the same call?          |
/// |----------------------|-------------------------------|
/// | `InvalidRequest`     | No, fix the input             |
/// | `EventNotFound`      | No, refresh the event list    |
/// | `CapacityExceeded`   | Only with fewer seats         |
/// | `TransientConflict`  | Yes                           |
/// | `StorageUnavailable` | Yes, with backoff             |
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// The request was rejected before reaching storage.
    #[error("{0}")]
    InvalidRequest(#[from] ValidationError),

    /// The event does not exist in the authoritative store.
    #[error("Event {0} was not found. It may not have been published yet.")]
    EventNotFound(EventId),

    /// Not enough seats remain for the request.
    #[error("Sorry, this event is fully booked! Requested {requested} seats but only {remaining} remain.")]
    CapacityExceeded {
        /// Event that is full
        event_id: EventId,
        /// Seats requested
        requested: u32,
        /// Seats still available when the request was evaluated
        remaining: u32,
    },

    /// Concurrent bookings kept invalidating the commit until retries ran out.
    #[error("Too many people are booking event {event_id} right now after {attempts} attempts. Please try again.")]
    TransientConflict {
        /// Contended event
        event_id: EventId,
        /// Commit attempts made before giving up
        attempts: usize,
    },

    /// The persistence backend could not be reached.
    #[error("Booking is temporarily unavailable: {0}")]
    StorageUnavailable(String),
}

impl ReservationError {
    /// Whether the caller may retry the identical request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientConflict { .. } | Self::StorageUnavailable(_)
        )
    }

    /// Stable machine-readable label, used for metrics and API error codes.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::EventNotFound(_) => "EVENT_NOT_FOUND",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::TransientConflict { .. } => "TRANSIENT_CONFLICT",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }
}
