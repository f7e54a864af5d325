//! # weOut Core
//!
//! Domain types and the storage contract for weOut ticket reservations.
//!
//! This crate provides the vocabulary shared by every other crate in the
//! workspace:
//!
//! - **Events**: bookable happenings with a fixed seat capacity and price
//! - **Tickets**: immutable receipts for seats reserved against one event
//! - **Store**: the [`store::ReservationStore`] contract, whose single mutating
//!   operation is an all-or-nothing commit guarded by an expected version
//! - **Errors**: the typed outcomes callers of `reserve` can observe
//!
//! ## Capacity Invariant
//!
//! For every event, at every point after a commit:
//!
//! ```text
//! sum(ticket.seats for tickets of the event) == event.booked_count <= event.capacity
//! ```
//!
//! The core crate does not enforce this on its own. It defines the types
//! and the commit contract; `weout-runtime` drives the read-check-write loop
//! and storage backends guarantee the commit is indivisible.
//!
//! ## Example
//!
//! ```
//! use weout_core::types::{Capacity, Price, SeatCount};
//!
//! let capacity = Capacity::new(10).unwrap();
//! let seats = SeatCount::try_from(3_i64).unwrap();
//! let total = Price::new(1500).total_for(seats);
//!
//! assert_eq!(capacity.value(), 10);
//! assert_eq!(total, Some(Price::new(4500)));
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};

pub mod error;
pub mod event;
pub mod store;
pub mod ticket;
pub mod types;
pub mod version;

pub use error::{ReservationError, ValidationError};
pub use event::{Category, Event, EventFilter, NewEvent};
pub use store::{ReservationCommit, ReservationStore, StoreError, StoredEvent};
pub use ticket::{Booker, Ticket, TicketStatus};
pub use types::{Capacity, EventId, Price, SeatCount, TicketId};
pub use version::Version;

/// Environment module - injected dependencies.
///
/// Time is the only ambient dependency the reservation core needs beyond
/// storage. It is abstracted so tests can pin timestamps.
pub mod environment {
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use weout_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock::new();
    /// let first = clock.now();
    /// let second = clock.now();
    /// assert!(second > first);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock that never hands out the same instant twice.
    ///
    /// Ticket timestamps are server-assigned and must be strictly
    /// increasing within a process, even when the OS clock is coarse or
    /// steps backwards. Each reading is at least one microsecond after the
    /// previous one.
    #[derive(Debug, Default)]
    pub struct SystemClock {
        last_micros: AtomicI64,
    }

    impl SystemClock {
        /// Create a new system clock.
        #[must_use]
        pub const fn new() -> Self {
            Self {
                last_micros: AtomicI64::new(i64::MIN),
            }
        }
    }

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            let wall = Utc::now().timestamp_micros();
            let previous = self
                .last_micros
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                    Some(wall.max(last.saturating_add(1)))
                })
                .unwrap_or(wall);
            let issued = wall.max(previous.saturating_add(1));

            DateTime::<Utc>::from_timestamp_micros(issued).unwrap_or_else(Utc::now)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn system_clock_is_strictly_increasing() {
            let clock = SystemClock::new();
            let mut previous = clock.now();
            for _ in 0..1_000 {
                let next = clock.now();
                assert!(next > previous);
                previous = next;
            }
        }
    }
}
