//! Identifiers and value objects for events and tickets.
//!
//! Every quantity that participates in the capacity invariant gets its own
//! type, so that a seat count can never be passed where a capacity is
//! expected and negative values are rejected at the boundary.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Unique identifier for a ticket, generated at commit time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Ticket price in whole currency units (0 = free).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(u64);

impl Price {
    /// A free event.
    pub const FREE: Self = Self(0);

    /// Creates a new `Price`
    #[must_use]
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// Get the amount
    #[must_use]
    pub const fn amount(self) -> u64 {
        self.0
    }

    /// Whether the event is free to attend.
    #[must_use]
    pub const fn is_free(self) -> bool {
        self.0 == 0
    }

    /// Total price for `seats` seats at this unit price.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub const fn total_for(self, seats: SeatCount) -> Option<Self> {
        match self.0.checked_mul(seats.value() as u64) {
            Some(total) => Some(Self(total)),
            None => None,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_free() {
            write!(f, "FREE")
        } else {
            write!(f, "KES {}", self.0)
        }
    }
}

/// Seat capacity of an event. Always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Capacity(u32);

impl Capacity {
    /// The smallest valid capacity.
    pub const MIN: Self = Self(1);

    /// Creates a new `Capacity`
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroCapacity`] if `value` is zero.
    pub const fn new(value: u32) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::ZeroCapacity);
        }
        Ok(Self(value))
    }

    /// Get the capacity value
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Capacity {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Capacity> for u32 {
    fn from(capacity: Capacity) -> Self {
        capacity.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of seats requested by (or granted to) one ticket. Always at least one.
///
/// Constructed from a signed integer so that zero and negative requests
/// coming from callers are rejected here, before any storage is touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct SeatCount(u32);

impl SeatCount {
    /// Get the seat count
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for SeatCount {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(ValidationError::NonPositiveSeats(value));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| ValidationError::TooManySeats(value))
    }
}

impl From<SeatCount> for u32 {
    fn from(seats: SeatCount) -> Self {
        seats.0
    }
}

impl fmt::Display for SeatCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn seat_count_rejects_zero_and_negative() {
        assert_eq!(
            SeatCount::try_from(0),
            Err(ValidationError::NonPositiveSeats(0))
        );
        assert_eq!(
            SeatCount::try_from(-3),
            Err(ValidationError::NonPositiveSeats(-3))
        );
        assert_eq!(SeatCount::try_from(2).unwrap().value(), 2);
    }

    #[test]
    fn seat_count_rejects_values_beyond_u32() {
        let too_many = i64::from(u32::MAX) + 1;
        assert_eq!(
            SeatCount::try_from(too_many),
            Err(ValidationError::TooManySeats(too_many))
        );
    }

    #[test]
    fn capacity_must_be_positive() {
        assert_eq!(Capacity::new(0), Err(ValidationError::ZeroCapacity));
        assert_eq!(Capacity::new(100).unwrap().value(), 100);
    }

    #[test]
    fn price_total_multiplies_by_seats() {
        let seats = SeatCount::try_from(3).unwrap();
        assert_eq!(Price::new(1500).total_for(seats), Some(Price::new(4500)));
        assert_eq!(Price::FREE.total_for(seats), Some(Price::FREE));
    }

    #[test]
    fn price_total_detects_overflow() {
        let seats = SeatCount::try_from(2).unwrap();
        assert_eq!(Price::new(u64::MAX).total_for(seats), None);
    }

    #[test]
    fn price_display() {
        assert_eq!(Price::FREE.to_string(), "FREE");
        assert_eq!(Price::new(3500).to_string(), "KES 3500");
    }

    #[test]
    fn seat_count_deserialization_validates() {
        let ok: SeatCount = serde_json::from_str("4").unwrap();
        assert_eq!(ok.value(), 4);
        assert!(serde_json::from_str::<SeatCount>("0").is_err());
        assert!(serde_json::from_str::<SeatCount>("-1").is_err());
    }

    #[test]
    fn event_id_round_trips_through_display() {
        let id = EventId::new();
        let parsed: EventId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
