//! Integration tests for the reservation flow against the in-memory store.
//!
//! Covers the boundary cases of the capacity check, error precedence,
//! all-or-nothing commits under injected faults, and conflict retries.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};
use weout_core::{EventId, ReservationError, ValidationError, Version};
use weout_runtime::{ReservationService, RetryPolicy};
use weout_testing::{CommitFault, InMemoryReservationStore, fixtures, stepping_clock};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Capture retry logs in test output.
fn init_tracing() -> DefaultGuard {
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt::layer().with_test_writer());

    tracing::subscriber::set_default(subscriber)
}

fn fast_policy(max_retries: usize) -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(max_retries)
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(2))
        .build()
}

fn service_with(store: &InMemoryReservationStore, max_retries: usize) -> ReservationService {
    ReservationService::new(
        Arc::new(store.clone()),
        Arc::new(stepping_clock()),
        fast_policy(max_retries),
    )
}

/// Seeds an event with `booked` seats already taken.
fn seeded(store: &InMemoryReservationStore, capacity: u32, booked: u32, price: u64) -> EventId {
    let mut event = fixtures::event(capacity, price);
    event.booked_count = booked;
    let id = event.id;
    store.seed(event);
    id
}

// ============================================================================
// Capacity boundaries
// ============================================================================

#[tokio::test]
async fn exact_fit_is_granted_then_event_is_sold_out() {
    let store = InMemoryReservationStore::new();
    let event_id = seeded(&store, 10, 8, 1000);
    let service = service_with(&store, 3);

    let ticket = service.reserve(event_id, 2, fixtures::booker(1)).await.unwrap();
    assert_eq!(ticket.seats.value(), 2);

    let event = store.event(event_id).unwrap();
    assert_eq!(event.booked_count, 10);
    assert!(event.is_sold_out());

    let result = service.reserve(event_id, 1, fixtures::booker(2)).await;
    assert_eq!(
        result,
        Err(ReservationError::CapacityExceeded {
            event_id,
            requested: 1,
            remaining: 0,
        })
    );
}

#[tokio::test]
async fn one_seat_too_many_is_rejected_without_side_effects() {
    let store = InMemoryReservationStore::new();
    let event_id = seeded(&store, 10, 8, 1000);

    let result = service_with(&store, 3)
        .reserve(event_id, 3, fixtures::booker(1))
        .await;

    assert_eq!(
        result,
        Err(ReservationError::CapacityExceeded {
            event_id,
            requested: 3,
            remaining: 2,
        })
    );
    assert_eq!(store.event(event_id).unwrap().booked_count, 8);
    assert!(store.tickets().is_empty());
    assert_eq!(store.commit_count(), 0);
}

#[tokio::test]
async fn total_price_is_seats_times_unit_price() {
    let store = InMemoryReservationStore::new();
    let event_id = seeded(&store, 100, 0, 1500);

    let ticket = service_with(&store, 3)
        .reserve(event_id, 3, fixtures::booker(1))
        .await
        .unwrap();

    assert_eq!(ticket.total_price.amount(), 4500);
}

#[tokio::test]
async fn free_event_tickets_cost_nothing() {
    let store = InMemoryReservationStore::new();
    let event_id = seeded(&store, 5, 0, 0);

    let ticket = service_with(&store, 3)
        .reserve(event_id, 5, fixtures::booker(1))
        .await
        .unwrap();

    assert!(ticket.total_price.is_free());
}

// ============================================================================
// Validation and precedence
// ============================================================================

#[tokio::test]
async fn zero_and_negative_seats_never_touch_storage() {
    let store = InMemoryReservationStore::new();
    let event_id = seeded(&store, 10, 0, 1000);
    let service = service_with(&store, 3);

    for seats in [0, -1, -100] {
        let result = service.reserve(event_id, seats, fixtures::booker(1)).await;
        assert_eq!(
            result,
            Err(ReservationError::InvalidRequest(
                ValidationError::NonPositiveSeats(seats)
            ))
        );
    }

    assert_eq!(store.load_count(), 0);
    assert_eq!(store.commit_count(), 0);
    assert_eq!(store.stored(event_id).unwrap().version, Version::INITIAL);
}

#[tokio::test]
async fn unknown_event_is_reported_before_capacity() {
    let store = InMemoryReservationStore::new();
    let missing = EventId::new();

    let result = service_with(&store, 3)
        .reserve(missing, 1_000_000, fixtures::booker(1))
        .await;

    assert_eq!(result, Err(ReservationError::EventNotFound(missing)));
}

#[tokio::test]
async fn invalid_seats_are_reported_before_unknown_event() {
    let store = InMemoryReservationStore::new();

    let result = service_with(&store, 3)
        .reserve(EventId::new(), 0, fixtures::booker(1))
        .await;

    assert!(matches!(result, Err(ReservationError::InvalidRequest(_))));
}

// ============================================================================
// Atomicity under faults
// ============================================================================

#[tokio::test]
async fn storage_fault_leaves_no_partial_reservation() {
    for fault in [
        CommitFault::BeforeTicketWrite,
        CommitFault::AfterTicketWrite,
        CommitFault::AfterCountIncrement,
    ] {
        let store = InMemoryReservationStore::new();
        let event_id = seeded(&store, 10, 4, 1000);
        store.fail_next_commit(fault);

        let result = service_with(&store, 3)
            .reserve(event_id, 2, fixtures::booker(1))
            .await;

        assert!(
            matches!(result, Err(ReservationError::StorageUnavailable(_))),
            "{fault:?}: {result:?}"
        );
        assert_eq!(store.event(event_id).unwrap().booked_count, 4, "{fault:?}");
        assert!(store.tickets().is_empty(), "{fault:?}");
    }
}

#[tokio::test]
async fn store_outage_is_storage_unavailable() {
    let store = InMemoryReservationStore::new();
    let event_id = seeded(&store, 10, 0, 1000);
    store.set_unavailable(true);

    let result = service_with(&store, 3)
        .reserve(event_id, 1, fixtures::booker(1))
        .await;

    let error = result.unwrap_err();
    assert_eq!(error.code(), "STORAGE_UNAVAILABLE");
    assert!(error.is_retryable());
}

// ============================================================================
// Conflict retries
// ============================================================================

#[tokio::test]
async fn conflicts_within_retry_budget_are_absorbed() {
    let _guard = init_tracing();
    let store = InMemoryReservationStore::new();
    let event_id = seeded(&store, 10, 0, 1000);
    store.inject_conflicts(3);

    let ticket = service_with(&store, 3)
        .reserve(event_id, 2, fixtures::booker(1))
        .await
        .unwrap();

    assert_eq!(ticket.seats.value(), 2);
    assert_eq!(store.commit_count(), 4);
    assert_eq!(store.event(event_id).unwrap().booked_count, 2);
}

#[tokio::test]
async fn exhausted_retries_surface_transient_conflict() {
    let _guard = init_tracing();
    let store = InMemoryReservationStore::new();
    let event_id = seeded(&store, 10, 0, 1000);
    store.inject_conflicts(10);

    let result = service_with(&store, 2)
        .reserve(event_id, 1, fixtures::booker(1))
        .await;

    assert_eq!(
        result,
        Err(ReservationError::TransientConflict {
            event_id,
            attempts: 3,
        })
    );
    assert_eq!(store.event(event_id).unwrap().booked_count, 0);
    assert!(store.tickets().is_empty());
}

#[tokio::test]
async fn capacity_is_rechecked_after_losing_a_race() {
    let store = InMemoryReservationStore::new();
    let event_id = seeded(&store, 3, 0, 1000);
    let service = service_with(&store, 5);

    // Another booker grabs two seats first; a 2-seat request no longer fits.
    service.reserve(event_id, 2, fixtures::booker(1)).await.unwrap();
    let result = service.reserve(event_id, 2, fixtures::booker(2)).await;

    assert!(matches!(
        result,
        Err(ReservationError::CapacityExceeded { remaining: 1, .. })
    ));
}

// ============================================================================
// Ticket queries
// ============================================================================

#[tokio::test]
async fn booker_tickets_are_newest_first_and_event_tickets_oldest_first() {
    let store = InMemoryReservationStore::new();
    let first = seeded(&store, 10, 0, 100);
    let second = seeded(&store, 10, 0, 200);
    let service = service_with(&store, 3);
    let booker = fixtures::booker(7);

    let a = service.reserve(first, 1, booker.clone()).await.unwrap();
    let b = service.reserve(second, 2, booker.clone()).await.unwrap();
    let c = service.reserve(first, 3, fixtures::booker(8)).await.unwrap();

    let mine: Vec<_> = service
        .tickets_for_booker(&booker.uid)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(mine, vec![b.id, a.id]);

    let for_event: Vec<_> = service
        .tickets_for_event(first)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(for_event, vec![a.id, c.id]);
}

#[tokio::test]
async fn blank_booker_uid_query_is_invalid() {
    let store = InMemoryReservationStore::new();
    let result = service_with(&store, 3).tickets_for_booker("   ").await;
    assert!(matches!(result, Err(ReservationError::InvalidRequest(_))));
}
