//! `PostgreSQL` reservation store for weOut.
//!
//! This crate provides the production implementation of the
//! `ReservationStore` trait from `weout-core`:
//!
//! - Events and tickets in two tables (see `migrations/`)
//! - Optimistic concurrency on a per-event `version` column
//! - Ticket insert and count update in one transaction
//! - Connection pooling
//!
//! # Commit Protocol
//!
//! ```text
//! BEGIN
//!   UPDATE events SET booked_count = $new, version = version + 1
//!    WHERE id = $id AND version = $expected AND $new <= capacity
//!    RETURNING version
//!   -- zero rows: diagnose (missing / stale / over capacity), ROLLBACK
//!   INSERT INTO tickets ...
//! COMMIT
//! ```
//!
//! The guarded `UPDATE` row-locks the event, so two commits computed from
//! the same version serialize and the second sees zero rows.
//!
//! # Example
//!
//! ```no_run
//! use weout_postgres::PostgresReservationStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresReservationStore::connect("postgres://localhost/weout", 10).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Instant;
use uuid::Uuid;
use weout_core::store::{
    ReservationCommit, ReservationStore, StoreError, StoreFuture, StoredEvent,
};
use weout_core::{
    Booker, Capacity, Event, EventId, Price, SeatCount, Ticket, TicketId, TicketStatus, Version,
};

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

const EVENT_COLUMNS: &str = "id, title, description, category, event_date, event_time, \
     location, area, price, image_url, capacity, booked_count, organizer, organizer_uid, \
     version, created_at";

const TICKET_COLUMNS: &str = "id, event_id, event_title, booker_uid, booker_name, \
     booker_email, seats, total_price, status, created_at";

/// `PostgreSQL`-backed [`ReservationStore`].
#[derive(Clone, Debug)]
pub struct PostgresReservationStore {
    pool: PgPool,
}

impl PostgresReservationStore {
    /// Create a store using an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` with a pool of `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn commit(&self, commit: ReservationCommit) -> Result<Version, StoreError> {
        let started = Instant::now();
        let event_uuid = *commit.event_id.as_uuid();
        let expected = to_i64(commit.expected_version.value(), "version")?;
        let booked_count = to_i32(commit.booked_count, "booked_count")?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", &e))?;

        let updated: Option<(i64,)> = sqlx::query_as(
            r"
            UPDATE events
               SET booked_count = $1, version = version + 1
             WHERE id = $2 AND version = $3 AND $1 <= capacity
            RETURNING version
            ",
        )
        .bind(booked_count)
        .bind(event_uuid)
        .bind(expected)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update event", &e))?;

        let Some((new_version,)) = updated else {
            let current: Option<(i64, i32)> =
                sqlx::query_as("SELECT version, capacity FROM events WHERE id = $1")
                    .bind(event_uuid)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| db_error("Failed to inspect event", &e))?;

            return Err(match current {
                None => StoreError::EventNotFound(commit.event_id),
                Some((version, _)) if version != expected => StoreError::ConcurrencyConflict {
                    event_id: commit.event_id,
                    expected: commit.expected_version,
                    actual: Version::new(from_i64(version, "version")?),
                },
                Some((_, capacity)) => StoreError::CapacityViolation {
                    event_id: commit.event_id,
                    booked_count: commit.booked_count,
                    capacity: from_i32(capacity, "capacity")?,
                },
            });
        };

        let ticket = &commit.ticket;
        sqlx::query(
            r"
            INSERT INTO tickets (
                id, event_id, event_title, booker_uid, booker_name, booker_email,
                seats, total_price, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(ticket.id.as_uuid())
        .bind(event_uuid)
        .bind(&ticket.event_title)
        .bind(&ticket.booker.uid)
        .bind(&ticket.booker.name)
        .bind(&ticket.booker.email)
        .bind(to_i32(ticket.seats.value(), "seats")?)
        .bind(to_i64(ticket.total_price.amount(), "total_price")?)
        .bind(ticket.status.as_str())
        .bind(ticket.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert ticket", &e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit reservation", &e))?;

        metrics::histogram!("postgres_reservation_commit_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(Version::new(from_i64(new_version, "version")?))
    }
}

impl ReservationStore for PostgresReservationStore {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                INSERT INTO events (
                    id, title, description, category, event_date, event_time,
                    location, area, price, image_url, capacity, booked_count,
                    organizer, organizer_uid, version, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 0, $15)
                ",
            )
            .bind(event.id.as_uuid())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.category.as_str())
            .bind(event.date)
            .bind(&event.time)
            .bind(&event.location)
            .bind(&event.area)
            .bind(to_i64(event.price.amount(), "price")?)
            .bind(&event.image_url)
            .bind(to_i32(event.capacity.value(), "capacity")?)
            .bind(to_i32(event.booked_count, "booked_count")?)
            .bind(&event.organizer)
            .bind(&event.organizer_uid)
            .bind(event.created_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(e) if sql_state(&e).as_deref() == Some(UNIQUE_VIOLATION) => {
                    Err(StoreError::DuplicateEvent(event.id))
                }
                Err(e) => Err(db_error("Failed to insert event", &e)),
            }
        })
    }

    fn load_event(&self, event_id: EventId) -> StoreFuture<'_, Option<StoredEvent>> {
        Box::pin(async move {
            let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
            let row = sqlx::query(&query)
                .bind(event_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load event", &e))?;

            row.as_ref().map(stored_event_from_row).transpose()
        })
    }

    fn list_events(&self) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let query = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY event_date, title");
            let rows = sqlx::query(&query)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("Failed to list events", &e))?;

            rows.iter()
                .map(|row| stored_event_from_row(row).map(|stored| stored.event))
                .collect()
        })
    }

    fn commit_reservation(&self, commit: ReservationCommit) -> StoreFuture<'_, Version> {
        Box::pin(self.commit(commit))
    }

    fn tickets_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            let query = format!(
                "SELECT {TICKET_COLUMNS} FROM tickets WHERE event_id = $1 ORDER BY created_at, id"
            );
            let rows = sqlx::query(&query)
                .bind(event_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load event tickets", &e))?;

            rows.iter().map(ticket_from_row).collect()
        })
    }

    fn tickets_for_booker(&self, booker_uid: String) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            let query = format!(
                "SELECT {TICKET_COLUMNS} FROM tickets WHERE booker_uid = $1 \
                 ORDER BY created_at DESC, id"
            );
            let rows = sqlx::query(&query)
                .bind(&booker_uid)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load booker tickets", &e))?;

            rows.iter().map(ticket_from_row).collect()
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("Ping failed", &e))?;
            Ok(())
        })
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn stored_event_from_row(row: &PgRow) -> Result<StoredEvent, StoreError> {
    let id: Uuid = column(row, "id")?;
    let category: String = column(row, "category")?;
    let price: i64 = column(row, "price")?;
    let capacity: i32 = column(row, "capacity")?;
    let booked_count: i32 = column(row, "booked_count")?;
    let version: i64 = column(row, "version")?;
    let date: NaiveDate = column(row, "event_date")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;

    let event = Event {
        id: EventId::from_uuid(id),
        title: column(row, "title")?,
        description: column(row, "description")?,
        category: category
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
        date,
        time: column(row, "event_time")?,
        location: column(row, "location")?,
        area: column(row, "area")?,
        price: Price::new(from_i64(price, "price")?),
        image_url: column(row, "image_url")?,
        capacity: Capacity::new(from_i32(capacity, "capacity")?)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        booked_count: from_i32(booked_count, "booked_count")?,
        organizer: column(row, "organizer")?,
        organizer_uid: column(row, "organizer_uid")?,
        created_at,
    };

    Ok(StoredEvent {
        event,
        version: Version::new(from_i64(version, "version")?),
    })
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, StoreError> {
    let id: Uuid = column(row, "id")?;
    let event_id: Uuid = column(row, "event_id")?;
    let seats: i32 = column(row, "seats")?;
    let total_price: i64 = column(row, "total_price")?;
    let status: String = column(row, "status")?;

    if status != TicketStatus::Confirmed.as_str() {
        return Err(StoreError::Corrupt(format!("Unknown ticket status: {status}")));
    }

    Ok(Ticket {
        id: TicketId::from_uuid(id),
        event_id: EventId::from_uuid(event_id),
        event_title: column(row, "event_title")?,
        booker: Booker::new(
            column::<String>(row, "booker_uid")?,
            column::<String>(row, "booker_name")?,
            column::<String>(row, "booker_email")?,
        ),
        seats: SeatCount::try_from(i64::from(seats))
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        total_price: Price::new(from_i64(total_price, "total_price")?),
        status: TicketStatus::Confirmed,
        created_at: column(row, "created_at")?,
    })
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("Column {name}: {e}")))
}

// ============================================================================
// Conversions and error mapping
// ============================================================================

fn to_i64(value: u64, field: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{field} {value} out of range")))
}

fn to_i32(value: u32, field: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{field} {value} out of range")))
}

fn from_i64(value: i64, field: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {field}: {value}")))
}

fn from_i32(value: i32, field: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {field}: {value}")))
}

fn sql_state(error: &sqlx::Error) -> Option<String> {
    error
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

/// Map a sqlx error to a store error.
///
/// Serialization failures and deadlocks mean a concurrent writer won; they
/// become [`StoreError::Aborted`] so callers retry from fresh state.
fn db_error(context: &str, error: &sqlx::Error) -> StoreError {
    match sql_state(error).as_deref() {
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
            tracing::debug!(context, %error, "Transaction aborted by concurrent writer");
            StoreError::Aborted(format!("{context}: {error}"))
        }
        _ => {
            tracing::error!(context, %error, "Database error");
            StoreError::Unavailable(format!("{context}: {error}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_values_are_corrupt() {
        assert!(matches!(to_i32(u32::MAX, "capacity"), Err(StoreError::Corrupt(_))));
        assert!(matches!(from_i64(-1, "version"), Err(StoreError::Corrupt(_))));
        assert_eq!(from_i32(7, "seats"), Ok(7));
        assert_eq!(to_i64(42, "price"), Ok(42));
    }

    #[test]
    fn non_database_errors_are_unavailable() {
        let error = db_error("Ping failed", &sqlx::Error::PoolTimedOut);
        assert!(matches!(error, StoreError::Unavailable(msg) if msg.starts_with("Ping failed")));
    }
}
