//! Tickets: immutable receipts of committed reservations.

use crate::error::ValidationError;
use crate::types::{EventId, Price, SeatCount, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the person booking, as supplied by the identity provider.
///
/// Opaque to the capacity logic; only `uid` is required.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Booker {
    /// Identity-provider user id
    pub uid: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
}

impl Booker {
    /// Creates a new `Booker`
    #[must_use]
    pub fn new(uid: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Validate the booker identity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Blank`] if the uid is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.uid.trim().is_empty() {
            return Err(ValidationError::Blank("booker uid"));
        }
        Ok(())
    }
}

/// Ticket status. Reservations commit fully or not at all, so there is no
/// pending state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Seats are held for the booker
    #[default]
    Confirmed,
}

impl TicketStatus {
    /// Storage representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
        }
    }
}

/// A committed reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket ID
    pub id: TicketId,
    /// Event the seats belong to
    pub event_id: EventId,
    /// Event title at commit time
    pub event_title: String,
    /// Who booked
    pub booker: Booker,
    /// Seats reserved
    pub seats: SeatCount,
    /// seats × event price at commit time
    pub total_price: Price,
    /// Always `confirmed`
    pub status: TicketStatus,
    /// Server-assigned commit timestamp
    pub created_at: DateTime<Utc>,
}
