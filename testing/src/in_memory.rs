//! In-memory reservation store for fast, deterministic testing.
//!
//! [`InMemoryReservationStore`] implements the full `ReservationStore`
//! contract with a `HashMap` behind an `RwLock`, plus two test hooks that a
//! real backend cannot offer on demand:
//!
//! - **Fault injection**: make the next commit fail at a chosen step of the
//!   atomic unit (before the ticket write, between the ticket write and the
//!   count increment, or after both). Writes are staged and only published
//!   once every step has passed, so an injected fault leaves no trace.
//! - **Conflict injection**: make the next N commits observe a concurrent
//!   writer that bumped the event's version after the caller's read.
//!
//! Each commit yields to the scheduler before taking the write lock, so
//! bookers racing on a multi-threaded runtime genuinely interleave between
//! their read and their commit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use weout_core::store::{
    ReservationCommit, ReservationStore, StoreError, StoreFuture, StoredEvent,
};
use weout_core::{Event, EventId, Ticket, Version};

/// Step of the atomic commit unit at which an injected fault fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitFault {
    /// Fail before anything is staged
    BeforeTicketWrite,
    /// Fail after the ticket is staged, before the count increment
    AfterTicketWrite,
    /// Fail after both writes are staged, before they are published
    AfterCountIncrement,
}

#[derive(Debug, Default)]
struct State {
    events: HashMap<EventId, StoredEvent>,
    tickets: Vec<Ticket>,
}

/// Writes staged by one commit. Applied to [`State`] only as a whole.
#[derive(Debug, Default)]
struct StagedWrites {
    tickets: Vec<Ticket>,
    event: Option<StoredEvent>,
}

#[derive(Debug, Default)]
struct Inner {
    state: RwLock<State>,
    next_fault: Mutex<Option<CommitFault>>,
    pending_conflicts: AtomicUsize,
    unavailable: std::sync::atomic::AtomicBool,
    loads: AtomicUsize,
    commits: AtomicUsize,
}

/// In-memory `ReservationStore`.
///
/// Cloning is cheap and clones share state.
///
/// # Example
///
/// ```
/// use weout_testing::{InMemoryReservationStore, fixtures};
///
/// let store = InMemoryReservationStore::new();
/// let event = fixtures::event(10, 1500);
/// store.seed(event.clone());
///
/// assert_eq!(store.event(event.id).map(|e| e.booked_count), Some(0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryReservationStore {
    inner: Arc<Inner>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

impl InMemoryReservationStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event directly, bypassing the async API. Replaces any
    /// event with the same ID and resets its version.
    pub fn seed(&self, event: Event) {
        if let Ok(mut state) = self.inner.state.write() {
            state.events.insert(
                event.id,
                StoredEvent {
                    event,
                    version: Version::INITIAL,
                },
            );
        }
    }

    /// Current snapshot of an event.
    #[must_use]
    pub fn event(&self, event_id: EventId) -> Option<Event> {
        self.stored(event_id).map(|stored| stored.event)
    }

    /// Current snapshot of an event with its version.
    #[must_use]
    pub fn stored(&self, event_id: EventId) -> Option<StoredEvent> {
        self.inner
            .state
            .read()
            .ok()
            .and_then(|state| state.events.get(&event_id).cloned())
    }

    /// All committed tickets, in commit order.
    #[must_use]
    pub fn tickets(&self) -> Vec<Ticket> {
        self.inner
            .state
            .read()
            .map(|state| state.tickets.clone())
            .unwrap_or_default()
    }

    /// Sum of ticket seats committed against `event_id`.
    #[must_use]
    pub fn seats_ticketed(&self, event_id: EventId) -> u32 {
        self.tickets()
            .iter()
            .filter(|ticket| ticket.event_id == event_id)
            .map(|ticket| ticket.seats.value())
            .sum()
    }

    /// Make the next commit fail at `fault`.
    pub fn fail_next_commit(&self, fault: CommitFault) {
        if let Ok(mut next) = self.inner.next_fault.lock() {
            *next = Some(fault);
        }
    }

    /// Make the next `count` commits lose a race against a phantom writer.
    pub fn inject_conflicts(&self, count: usize) {
        self.inner.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// Make every operation fail with `Unavailable` until called with `false`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `load_event` calls served.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.inner.loads.load(Ordering::SeqCst)
    }

    /// Number of `commit_reservation` calls received.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store switched offline".to_string(),
            ));
        }
        Ok(())
    }

    fn take_fault(&self) -> Option<CommitFault> {
        self.inner
            .next_fault
            .lock()
            .ok()
            .and_then(|mut next| next.take())
    }

    fn take_conflict(&self) -> bool {
        self.inner
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn apply(&self, commit: ReservationCommit) -> Result<Version, StoreError> {
        let fault = self.take_fault();
        let fault_at = |step: CommitFault| -> Result<(), StoreError> {
            if fault == Some(step) {
                tracing::debug!(?step, "Injected commit fault");
                return Err(StoreError::Unavailable(format!(
                    "injected fault at {step:?}"
                )));
            }
            Ok(())
        };

        let mut state = self.inner.state.write().map_err(poisoned)?;

        if self.take_conflict() {
            if let Some(stored) = state.events.get_mut(&commit.event_id) {
                stored.version = stored.version.next();
            }
        }

        let current = state
            .events
            .get(&commit.event_id)
            .ok_or(StoreError::EventNotFound(commit.event_id))?;

        if current.version != commit.expected_version {
            return Err(StoreError::ConcurrencyConflict {
                event_id: commit.event_id,
                expected: commit.expected_version,
                actual: current.version,
            });
        }

        let capacity = current.event.capacity.value();
        if commit.booked_count > capacity {
            return Err(StoreError::CapacityViolation {
                event_id: commit.event_id,
                booked_count: commit.booked_count,
                capacity,
            });
        }

        let mut staged = StagedWrites::default();

        fault_at(CommitFault::BeforeTicketWrite)?;
        staged.tickets.push(commit.ticket);

        fault_at(CommitFault::AfterTicketWrite)?;
        let mut updated = current.clone();
        updated.event.booked_count = commit.booked_count;
        updated.version = current.version.next();
        let new_version = updated.version;
        staged.event = Some(updated);

        fault_at(CommitFault::AfterCountIncrement)?;

        // Publish both writes under the same lock acquisition.
        state.tickets.append(&mut staged.tickets);
        if let Some(updated) = staged.event {
            state.events.insert(commit.event_id, updated);
        }

        Ok(new_version)
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check_available()?;
            let mut state = self.inner.state.write().map_err(poisoned)?;
            if state.events.contains_key(&event.id) {
                return Err(StoreError::DuplicateEvent(event.id));
            }
            state.events.insert(
                event.id,
                StoredEvent {
                    event,
                    version: Version::INITIAL,
                },
            );
            Ok(())
        })
    }

    fn load_event(&self, event_id: EventId) -> StoreFuture<'_, Option<StoredEvent>> {
        Box::pin(async move {
            self.check_available()?;
            self.inner.loads.fetch_add(1, Ordering::SeqCst);
            let state = self.inner.state.read().map_err(poisoned)?;
            Ok(state.events.get(&event_id).cloned())
        })
    }

    fn list_events(&self) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            self.check_available()?;
            let state = self.inner.state.read().map_err(poisoned)?;
            Ok(state
                .events
                .values()
                .map(|stored| stored.event.clone())
                .collect())
        })
    }

    fn commit_reservation(&self, commit: ReservationCommit) -> StoreFuture<'_, Version> {
        Box::pin(async move {
            self.check_available()?;
            self.inner.commits.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.apply(commit)
        })
    }

    fn tickets_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            self.check_available()?;
            let state = self.inner.state.read().map_err(poisoned)?;
            Ok(state
                .tickets
                .iter()
                .filter(|ticket| ticket.event_id == event_id)
                .cloned()
                .collect())
        })
    }

    fn tickets_for_booker(&self, booker_uid: String) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            self.check_available()?;
            let state = self.inner.state.read().map_err(poisoned)?;
            let mut tickets: Vec<Ticket> = state
                .tickets
                .iter()
                .rev()
                .filter(|ticket| ticket.booker.uid == booker_uid)
                .cloned()
                .collect();
            tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(tickets)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check_available() })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use weout_core::types::SeatCount;

    fn commit_for(store: &InMemoryReservationStore, event_id: EventId, seats: i64) -> ReservationCommit {
        let stored = store.stored(event_id).expect("event seeded");
        let seats = SeatCount::try_from(seats).unwrap();
        ReservationCommit {
            event_id,
            expected_version: stored.version,
            booked_count: stored.event.booked_count + seats.value(),
            ticket: fixtures::ticket(&stored.event, &fixtures::booker(1), seats),
        }
    }

    #[tokio::test]
    async fn commit_writes_ticket_and_count_together() {
        let store = InMemoryReservationStore::new();
        let event = fixtures::event(10, 500);
        store.seed(event.clone());

        let version = store
            .commit_reservation(commit_for(&store, event.id, 3))
            .await
            .unwrap();

        assert_eq!(version, Version::new(1));
        assert_eq!(store.event(event.id).unwrap().booked_count, 3);
        assert_eq!(store.seats_ticketed(event.id), 3);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = InMemoryReservationStore::new();
        let event = fixtures::event(10, 500);
        store.seed(event.clone());

        let stale = commit_for(&store, event.id, 1);
        store
            .commit_reservation(commit_for(&store, event.id, 1))
            .await
            .unwrap();

        let result = store.commit_reservation(stale).await;
        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { expected, actual, .. })
                if expected == Version::INITIAL && actual == Version::new(1)
        ));
        assert_eq!(store.tickets().len(), 1);
    }

    #[tokio::test]
    async fn over_capacity_commit_is_rejected() {
        let store = InMemoryReservationStore::new();
        let event = fixtures::event(2, 500);
        store.seed(event.clone());

        let result = store.commit_reservation(commit_for(&store, event.id, 3)).await;
        assert!(matches!(result, Err(StoreError::CapacityViolation { .. })));
        assert!(store.tickets().is_empty());
    }

    #[tokio::test]
    async fn injected_faults_leave_no_partial_state() {
        for fault in [
            CommitFault::BeforeTicketWrite,
            CommitFault::AfterTicketWrite,
            CommitFault::AfterCountIncrement,
        ] {
            let store = InMemoryReservationStore::new();
            let event = fixtures::event(10, 500);
            store.seed(event.clone());
            store.fail_next_commit(fault);

            let result = store.commit_reservation(commit_for(&store, event.id, 2)).await;

            assert!(matches!(result, Err(StoreError::Unavailable(_))), "{fault:?}");
            let stored = store.stored(event.id).unwrap();
            assert_eq!(stored.event.booked_count, 0, "{fault:?}");
            assert_eq!(stored.version, Version::INITIAL, "{fault:?}");
            assert!(store.tickets().is_empty(), "{fault:?}");
        }
    }

    #[tokio::test]
    async fn injected_conflicts_are_consumed_one_per_commit() {
        let store = InMemoryReservationStore::new();
        let event = fixtures::event(10, 500);
        store.seed(event.clone());
        store.inject_conflicts(1);

        let first = store.commit_reservation(commit_for(&store, event.id, 1)).await;
        assert!(matches!(first, Err(StoreError::ConcurrencyConflict { .. })));

        let second = store.commit_reservation(commit_for(&store, event.id, 1)).await;
        assert_eq!(second, Ok(Version::new(2)));
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = InMemoryReservationStore::new();
        let event = fixtures::event(10, 0);

        store.insert_event(event.clone()).await.unwrap();
        let result = store.insert_event(event.clone()).await;
        assert_eq!(result, Err(StoreError::DuplicateEvent(event.id)));
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = InMemoryReservationStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));

        store.set_unavailable(false);
        assert_eq!(store.ping().await, Ok(()));
    }
}
