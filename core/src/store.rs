//! Storage contract for events and tickets.
//!
//! This module defines the abstraction every persistence backend implements.
//! The contract is deliberately narrow: the only way to change an event's
//! `booked_count` is [`ReservationStore::commit_reservation`], which writes
//! the ticket and the new count as one indivisible unit.
//!
//! # Atomic Commit Unit
//!
//! A commit names the [`Version`] of the event it was computed from. The
//! backend must, atomically:
//!
//! 1. Verify the event exists (`EventNotFound` otherwise)
//! 2. Verify the event is still at `expected_version` (`ConcurrencyConflict` otherwise)
//! 3. Verify `booked_count <= capacity` (`CapacityViolation` otherwise)
//! 4. Persist the ticket, set the new `booked_count`, and bump the version
//!
//! Either all of step 4 becomes visible or none of it does. A reader must
//! never observe the ticket without the count, or the count without the
//! ticket.
//!
//! # Implementations
//!
//! - `PostgresReservationStore` (in `weout-postgres`): production backend
//! - `InMemoryReservationStore` (in `weout-testing`): tests and local runs,
//!   with fault and conflict injection
//!
//! # Dyn Compatibility
//!
//! Methods return boxed futures instead of using `async fn` so the service
//! can hold an `Arc<dyn ReservationStore>` chosen at startup.

use crate::event::Event;
use crate::ticket::Ticket;
use crate::types::EventId;
use crate::version::Version;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency conflict: the event moved past the expected version.
    ///
    /// Another reservation committed between the caller's read and its
    /// commit. The caller must re-read and re-check capacity.
    #[error("Concurrency conflict on event {event_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Contended event
        event_id: EventId,
        /// The version the commit was computed from
        expected: Version,
        /// The version currently stored
        actual: Version,
    },

    /// The backend aborted the transaction because of a concurrent writer
    /// (serialization failure, deadlock). Same handling as a version conflict.
    #[error("Transaction aborted by a concurrent writer: {0}")]
    Aborted(String),

    /// The commit would push `booked_count` past capacity.
    #[error("Commit for event {event_id} would book {booked_count} of {capacity} seats")]
    CapacityViolation {
        /// Event whose capacity would be exceeded
        event_id: EventId,
        /// Requested new booked count
        booked_count: u32,
        /// Event capacity
        capacity: u32,
    },

    /// Event not found.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// An event with this ID already exists.
    #[error("Event already exists: {0}")]
    DuplicateEvent(EventId),

    /// The backend could not be reached or failed mid-operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded into domain types.
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether the failure was caused by a concurrent writer, meaning the
    /// operation may succeed if recomputed from fresh state.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. } | Self::Aborted(_))
    }
}

/// An event together with the version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEvent {
    /// Event snapshot
    pub event: Event,
    /// Version of the snapshot
    pub version: Version,
}

/// One atomic reservation write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservationCommit {
    /// Event being booked
    pub event_id: EventId,
    /// Version the capacity check was performed against
    pub expected_version: Version,
    /// New `booked_count` (old count + ticket seats)
    pub booked_count: u32,
    /// Ticket to persist
    pub ticket: Ticket,
}

/// Persistence abstraction for events and tickets.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a single store is shared by every
/// concurrent caller of the reservation service.
pub trait ReservationStore: Send + Sync {
    /// Persist a newly published event at [`Version::INITIAL`].
    ///
    /// # Errors
    ///
    /// - `DuplicateEvent`: an event with the same ID exists
    /// - `Unavailable`: backend failure
    fn insert_event(&self, event: Event) -> StoreFuture<'_, ()>;

    /// Load an event and its current version.
    ///
    /// Returns `Ok(None)` if the event does not exist.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    /// - `Corrupt`: stored row cannot be decoded
    fn load_event(&self, event_id: EventId) -> StoreFuture<'_, Option<StoredEvent>>;

    /// Load every event, in no particular order.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    /// - `Corrupt`: a stored row cannot be decoded
    fn list_events(&self) -> StoreFuture<'_, Vec<Event>>;

    /// Apply a reservation commit atomically (see module docs).
    ///
    /// Returns the event's new version.
    ///
    /// # Errors
    ///
    /// - `EventNotFound`: event does not exist
    /// - `ConcurrencyConflict` / `Aborted`: a concurrent writer won
    /// - `CapacityViolation`: the new count exceeds capacity
    /// - `Unavailable`: backend failure; nothing was applied
    fn commit_reservation(&self, commit: ReservationCommit) -> StoreFuture<'_, Version>;

    /// Tickets of one event, oldest first.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    fn tickets_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Ticket>>;

    /// Tickets of one booker, newest first.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    fn tickets_for_booker(&self, booker_uid: String) -> StoreFuture<'_, Vec<Ticket>>;

    /// Check the backend is reachable.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    fn ping(&self) -> StoreFuture<'_, ()>;
}
