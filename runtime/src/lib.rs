//! # weOut Runtime
//!
//! Services that drive the weOut booking flow on top of a
//! [`ReservationStore`](weout_core::ReservationStore).
//!
//! ## Core Components
//!
//! - **[`ReservationService`]**: overbooking-safe `reserve` with optimistic
//!   concurrency and bounded, jittered retries
//! - **[`EventCatalog`]**: publishing and discovery of events
//! - **[`retry`]**: exponential backoff policy shared by the service and the
//!   server's startup connection logic
//! - **[`metrics`]**: Prometheus recorder and metric helpers
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use weout_core::environment::SystemClock;
//! use weout_runtime::{EventCatalog, ReservationService, retry::RetryPolicy};
//! use weout_testing::{InMemoryReservationStore, fixtures};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryReservationStore::new());
//! let clock = Arc::new(SystemClock::new());
//!
//! let catalog = EventCatalog::new(store.clone(), clock.clone());
//! let service = ReservationService::new(store, clock, RetryPolicy::default());
//!
//! let event = catalog.publish(fixtures::new_event(10, 1500)).await?;
//! let ticket = service.reserve(event.id, 2, fixtures::booker(1)).await?;
//! assert_eq!(ticket.total_price.amount(), 3000);
//! # Ok(())
//! # }
//! ```

/// Event publishing and discovery
pub mod catalog;

/// Prometheus metrics for observability
pub mod metrics;

/// Capacity-checked reservations
pub mod reservation;

/// Retry logic with exponential backoff
pub mod retry;

pub use catalog::{CatalogError, EventCatalog};
pub use reservation::ReservationService;
pub use retry::RetryPolicy;
