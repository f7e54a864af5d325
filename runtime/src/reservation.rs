//! The reservation service: capacity-checked, overbooking-safe bookings.
//!
//! # Algorithm
//!
//! `reserve` is an optimistic read-check-write loop:
//!
//! 1. Validate the request (seat count ≥ 1, booker uid present)
//! 2. Load the event and its version from the authoritative store
//! 3. Reject with `CapacityExceeded` if `booked_count + seats > capacity`
//! 4. Build the ticket (price snapshotted from the event just read)
//! 5. Commit ticket + new count, guarded by the version from step 2
//! 6. If another booking committed in between, back off and go to step 2
//!
//! Capacity is re-checked against fresh state on every attempt, so a
//! retried request can end in `CapacityExceeded` when the last seats were
//! taken by whoever won the race.
//!
//! A version only moves when a commit succeeds, and each success consumes
//! at least one seat. A single caller can therefore lose at most
//! `capacity` races; with `max_retries >= capacity` contention alone never
//! produces `TransientConflict`.

use crate::metrics::ReservationMetrics;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Instant;
use weout_core::environment::Clock;
use weout_core::store::{ReservationCommit, ReservationStore, StoreError};
use weout_core::{
    Booker, EventId, ReservationError, SeatCount, Ticket, TicketId, TicketStatus, ValidationError,
};

/// Books seats against events held in a [`ReservationStore`].
///
/// Cheap to share: wrap in an `Arc` and call from any number of tasks.
#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for ReservationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ReservationService {
    /// Create a service over `store`, stamping tickets with `clock`.
    #[must_use]
    pub fn new(store: Arc<dyn ReservationStore>, clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// The retry policy applied to commit conflicts.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Reserve `requested_seats` seats of `event_id` for `booker`.
    ///
    /// On success the returned ticket is already durable and the event's
    /// `booked_count` includes its seats.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: `requested_seats < 1`, blank booker uid, or a
    ///   total price that overflows. Storage is not touched.
    /// - `EventNotFound`: the event does not exist
    /// - `CapacityExceeded`: fewer than `requested_seats` seats remain
    /// - `TransientConflict`: concurrent bookings won every retry
    /// - `StorageUnavailable`: the store failed; nothing was booked
    #[tracing::instrument(
        skip(self, booker),
        fields(booker = %booker.uid),
        name = "reserve"
    )]
    pub async fn reserve(
        &self,
        event_id: EventId,
        requested_seats: i64,
        booker: Booker,
    ) -> Result<Ticket, ReservationError> {
        let started = Instant::now();
        let result = self.try_reserve(event_id, requested_seats, booker).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(ticket) => {
                ReservationMetrics::record_confirmed(ticket.seats.value(), elapsed);
                tracing::info!(
                    ticket_id = %ticket.id,
                    seats = ticket.seats.value(),
                    total_price = ticket.total_price.amount(),
                    "Reservation confirmed"
                );
            }
            Err(error) => {
                ReservationMetrics::record_rejected(error.code(), elapsed);
                if error.is_retryable() {
                    tracing::warn!(code = error.code(), %error, "Reservation failed");
                } else {
                    tracing::info!(code = error.code(), %error, "Reservation rejected");
                }
            }
        }

        result
    }

    async fn try_reserve(
        &self,
        event_id: EventId,
        requested_seats: i64,
        booker: Booker,
    ) -> Result<Ticket, ReservationError> {
        let seats = SeatCount::try_from(requested_seats)?;
        booker.validate()?;

        let mut attempt = 0;
        loop {
            let stored = self
                .store
                .load_event(event_id)
                .await
                .map_err(storage_error)?
                .ok_or(ReservationError::EventNotFound(event_id))?;
            let event = stored.event;

            let Some(booked_count) = event.booked_after(seats) else {
                return Err(ReservationError::CapacityExceeded {
                    event_id,
                    requested: seats.value(),
                    remaining: event.remaining(),
                });
            };

            let total_price =
                event
                    .price
                    .total_for(seats)
                    .ok_or(ValidationError::PriceOverflow {
                        seats: seats.value(),
                        unit_price: event.price.amount(),
                    })?;

            let ticket = Ticket {
                id: TicketId::new(),
                event_id,
                event_title: event.title,
                booker: booker.clone(),
                seats,
                total_price,
                status: TicketStatus::Confirmed,
                created_at: self.clock.now(),
            };

            let commit = ReservationCommit {
                event_id,
                expected_version: stored.version,
                booked_count,
                ticket: ticket.clone(),
            };

            match self.store.commit_reservation(commit).await {
                Ok(version) => {
                    tracing::debug!(attempt, %version, booked_count, "Reservation committed");
                    return Ok(ticket);
                }
                Err(error) if error.is_conflict() => {
                    ReservationMetrics::record_conflict();
                    if attempt >= self.policy.max_retries {
                        return Err(ReservationError::TransientConflict {
                            event_id,
                            attempts: attempt + 1,
                        });
                    }

                    let delay = self.policy.backoff(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        %error,
                        "Commit lost to a concurrent booking, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(StoreError::CapacityViolation {
                    booked_count,
                    capacity,
                    ..
                }) => {
                    let already_booked = booked_count.saturating_sub(seats.value());
                    return Err(ReservationError::CapacityExceeded {
                        event_id,
                        requested: seats.value(),
                        remaining: capacity.saturating_sub(already_booked),
                    });
                }
                Err(StoreError::EventNotFound(_)) => {
                    return Err(ReservationError::EventNotFound(event_id));
                }
                Err(error) => return Err(storage_error(error)),
            }
        }
    }

    /// Tickets of one event, oldest first.
    ///
    /// # Errors
    ///
    /// - `EventNotFound`: the event does not exist
    /// - `StorageUnavailable`: the store failed
    pub async fn tickets_for_event(&self, event_id: EventId) -> Result<Vec<Ticket>, ReservationError> {
        if self
            .store
            .load_event(event_id)
            .await
            .map_err(storage_error)?
            .is_none()
        {
            return Err(ReservationError::EventNotFound(event_id));
        }

        self.store
            .tickets_for_event(event_id)
            .await
            .map_err(storage_error)
    }

    /// Tickets of one booker, newest first.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: blank uid
    /// - `StorageUnavailable`: the store failed
    pub async fn tickets_for_booker(&self, booker_uid: &str) -> Result<Vec<Ticket>, ReservationError> {
        let uid = booker_uid.trim();
        if uid.is_empty() {
            return Err(ValidationError::Blank("booker uid").into());
        }

        self.store
            .tickets_for_booker(uid.to_string())
            .await
            .map_err(storage_error)
    }

    /// Check the store is reachable.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` when the store does not respond.
    pub async fn ready(&self) -> Result<(), ReservationError> {
        self.store.ping().await.map_err(storage_error)
    }
}

fn storage_error(error: StoreError) -> ReservationError {
    ReservationError::StorageUnavailable(error.to_string())
}
