//! Application state for Axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use weout_core::ReservationStore;
use weout_core::environment::Clock;
use weout_runtime::{EventCatalog, ReservationService, RetryPolicy};

/// Application state shared across all HTTP handlers.
///
/// Cloning is cheap: every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Capacity-checked reservations and ticket queries
    pub reservations: Arc<ReservationService>,
    /// Event publishing and discovery
    pub catalog: Arc<EventCatalog>,
    /// Prometheus recorder handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the services over one shared store and clock.
    #[must_use]
    pub fn new(store: Arc<dyn ReservationStore>, clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            reservations: Arc::new(ReservationService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                policy,
            )),
            catalog: Arc::new(EventCatalog::new(store, clock)),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle rendered by `GET /metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weout_testing::{InMemoryReservationStore, test_clock};

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_state_starts_without_metrics() {
        let state = AppState::new(
            Arc::new(InMemoryReservationStore::new()),
            Arc::new(test_clock()),
            RetryPolicy::default(),
        );
        assert!(state.metrics.is_none());
    }
}
