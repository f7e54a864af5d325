//! Event catalog: publishing and discovery.
//!
//! Publishing is the only place events are created. It never touches
//! `booked_count` after creation; that belongs to the reservation service.

use crate::metrics::CatalogMetrics;
use std::sync::Arc;
use thiserror::Error;
use weout_core::environment::Clock;
use weout_core::store::{ReservationStore, StoreError};
use weout_core::{Event, EventFilter, EventId, NewEvent, ValidationError};

/// Errors returned by [`EventCatalog`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Organizer input was rejected.
    #[error("{0}")]
    Invalid(#[from] ValidationError),

    /// The event does not exist.
    #[error("Event {0} was not found")]
    NotFound(EventId),

    /// The store failed.
    #[error("Catalog is temporarily unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CatalogError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::EventNotFound(id) => Self::NotFound(id),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Publishes and lists events.
#[derive(Clone)]
pub struct EventCatalog {
    store: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
}

impl EventCatalog {
    /// Create a catalog over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ReservationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Publish a new event with nothing booked.
    ///
    /// # Errors
    ///
    /// - `Invalid`: blank title or organizer uid
    /// - `Unavailable`: the store failed
    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    pub async fn publish(&self, input: NewEvent) -> Result<Event, CatalogError> {
        input.validate()?;

        let event = input.publish(EventId::new(), self.clock.now());
        self.store.insert_event(event.clone()).await?;

        CatalogMetrics::record_published();
        tracing::info!(
            event_id = %event.id,
            capacity = event.capacity.value(),
            price = event.price.amount(),
            "Event published"
        );
        Ok(event)
    }

    /// Fetch one event.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such event
    /// - `Unavailable`: the store failed
    pub async fn get(&self, event_id: EventId) -> Result<Event, CatalogError> {
        self.store
            .load_event(event_id)
            .await?
            .map(|stored| stored.event)
            .ok_or(CatalogError::NotFound(event_id))
    }

    /// Events matching `filter`, ordered by date then title.
    ///
    /// # Errors
    ///
    /// `Unavailable` when the store failed.
    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, CatalogError> {
        let events = self.store.list_events().await?;
        Ok(filter.apply(events))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use weout_core::Category;
    use weout_testing::{InMemoryReservationStore, fixtures, test_clock};

    fn catalog(store: &InMemoryReservationStore) -> EventCatalog {
        EventCatalog::new(Arc::new(store.clone()), Arc::new(test_clock()))
    }

    #[tokio::test]
    async fn published_event_starts_empty() {
        let store = InMemoryReservationStore::new();
        let catalog = catalog(&store);

        let event = catalog.publish(fixtures::new_event(50, 2000)).await.unwrap();

        assert_eq!(event.booked_count, 0);
        assert_eq!(event.remaining(), 50);
        assert_eq!(catalog.get(event.id).await.unwrap(), event);
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let store = InMemoryReservationStore::new();
        let mut input = fixtures::new_event(10, 0);
        input.title = "  ".to_string();

        let result = catalog(&store).publish(input).await;
        assert_eq!(result, Err(CatalogError::Invalid(ValidationError::Blank("title"))));
        assert!(store.list_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_applies_filter() {
        let store = InMemoryReservationStore::new();
        let catalog = catalog(&store);

        catalog.publish(fixtures::new_event(10, 0)).await.unwrap();
        let mut tech = fixtures::new_event(10, 500);
        tech.title = "DevFest".to_string();
        tech.category = Category::Tech;
        catalog.publish(tech).await.unwrap();

        let filter = EventFilter {
            category: Some(Category::Tech),
            ..EventFilter::default()
        };
        let titles: Vec<_> = catalog
            .list(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["DevFest"]);
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let store = InMemoryReservationStore::new();
        let id = EventId::new();
        assert_eq!(catalog(&store).get(id).await, Err(CatalogError::NotFound(id)));
    }
}
