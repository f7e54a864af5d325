//! # weOut Testing
//!
//! Testing utilities for the weOut reservation service.
//!
//! This crate provides:
//! - [`InMemoryReservationStore`]: a complete store with fault and conflict injection
//! - Deterministic clocks
//! - Event, booker and ticket fixtures
//! - proptest strategies for seat requests
//!
//! ## Example
//!
//! ```
//! use weout_testing::{InMemoryReservationStore, fixtures, test_clock};
//! use weout_core::environment::Clock;
//!
//! let store = InMemoryReservationStore::new();
//! let event = fixtures::event(10, 1500);
//! store.seed(event.clone());
//!
//! assert_eq!(store.event(event.id).map(|e| e.remaining()), Some(10));
//! assert_eq!(test_clock().now(), test_clock().now());
//! ```

use chrono::{DateTime, Utc};
use weout_core::environment::Clock;

pub mod in_memory;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use weout_testing::mocks::FixedClock;
    /// use weout_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2);
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances one second on every reading.
    ///
    /// Gives each ticket a distinct, predictable `created_at`, so ordering
    /// assertions do not depend on wall-clock resolution.
    #[derive(Debug)]
    pub struct SteppingClock {
        next_secs: AtomicI64,
    }

    impl SteppingClock {
        /// Clock whose first reading is `start`
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                next_secs: AtomicI64::new(start.timestamp()),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let secs = self.next_secs.fetch_add(1, Ordering::SeqCst);
            DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
        }
    }

    /// 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    /// Create a stepping clock starting at 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn stepping_clock() -> SteppingClock {
        SteppingClock::new(epoch())
    }
}

/// Ready-made domain values.
pub mod fixtures {
    use super::mocks::epoch;
    use chrono::NaiveDate;
    use weout_core::types::{Capacity, EventId, Price, SeatCount, TicketId};
    use weout_core::{Booker, Category, Event, NewEvent, Ticket, TicketStatus};

    /// Organizer input for a Nairobi music event.
    ///
    /// A zero `capacity` is clamped to 1.
    #[must_use]
    pub fn new_event(capacity: u32, price: u64) -> NewEvent {
        NewEvent {
            title: "Sol Fest".to_string(),
            description: "Afro-pop on the lawn".to_string(),
            category: Category::Music,
            date: NaiveDate::from_ymd_opt(2026, 12, 12).unwrap_or_default(),
            time: "2:00 PM".to_string(),
            location: "Carnivore Grounds".to_string(),
            area: "Langata".to_string(),
            price: Price::new(price),
            image_url: None,
            capacity: Capacity::new(capacity.max(1)).unwrap_or(Capacity::MIN),
            organizer: "Sol Generation".to_string(),
            organizer_uid: "organizer-1".to_string(),
        }
    }

    /// A published event with nothing booked.
    #[must_use]
    pub fn event(capacity: u32, price: u64) -> Event {
        new_event(capacity, price).publish(EventId::new(), epoch())
    }

    /// The `n`th distinct booker.
    #[must_use]
    pub fn booker(n: usize) -> Booker {
        Booker::new(
            format!("booker-{n}"),
            format!("Booker {n}"),
            format!("booker{n}@example.com"),
        )
    }

    /// A ticket for `seats` of `event`, priced at the event's current price.
    #[must_use]
    pub fn ticket(event: &Event, booker: &Booker, seats: SeatCount) -> Ticket {
        Ticket {
            id: TicketId::new(),
            event_id: event.id,
            event_title: event.title.clone(),
            booker: booker.clone(),
            seats,
            total_price: event.price.total_for(seats).unwrap_or(Price::FREE),
            status: TicketStatus::Confirmed,
            created_at: epoch(),
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// A raw seat request as a client might send it: mostly small positive
    /// counts, occasionally zero or negative.
    pub fn seat_request() -> impl Strategy<Value = i64> {
        prop_oneof![
            8 => 1_i64..=5,
            1 => -3_i64..=0,
        ]
    }

    /// A sequence of raw seat requests.
    pub fn seat_requests(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
        prop::collection::vec(seat_request(), 0..=max_len)
    }

    /// An event capacity small enough that request sequences exhaust it.
    pub fn small_capacity() -> impl Strategy<Value = u32> {
        1_u32..=20
    }
}

pub use in_memory::{CommitFault, InMemoryReservationStore};
pub use mocks::{FixedClock, SteppingClock, stepping_clock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_stepping_clock_advances() {
        let clock = stepping_clock();
        let first = clock.now();
        let second = clock.now();
        assert_eq!(second - first, chrono::Duration::seconds(1));
    }

    #[test]
    fn fixture_event_starts_empty() {
        let event = fixtures::event(0, 100);
        assert_eq!(event.capacity.value(), 1);
        assert_eq!(event.booked_count, 0);
    }
}
