//! Prometheus metrics for reservations and the event catalog.
//!
//! Metric names:
//! - `reservations_total{outcome}`: one per `reserve` call, labelled with
//!   `confirmed` or the error code
//! - `reservation_seats_booked_total`: seats granted by confirmed reservations
//! - `reservation_conflicts_total`: commits lost to a concurrent writer
//! - `reservation_duration_seconds`: end-to-end `reserve` latency
//! - `events_published_total`: events accepted by the catalog
//!
//! # Example
//!
//! ```rust,no_run
//! use weout_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! let text = server.render();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder.
///
/// The server binary renders the recorder's output on `GET /metrics`; `addr`
/// is the advertised scrape address used for logging.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the Prometheus recorder, then describe every metric on it.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a
    /// warning and succeeds without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                register_metrics();
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!(
        "reservations_total",
        "Reservation attempts by outcome (confirmed or error code)"
    );
    describe_counter!(
        "reservation_seats_booked_total",
        "Seats granted by confirmed reservations"
    );
    describe_counter!(
        "reservation_conflicts_total",
        "Reservation commits rejected because another booking committed first"
    );
    describe_histogram!(
        "reservation_duration_seconds",
        "Time taken to evaluate a reservation, retries included"
    );
    describe_counter!("events_published_total", "Events published to the catalog");
}

/// Reservation metrics recorder.
pub struct ReservationMetrics;

impl ReservationMetrics {
    /// Record a confirmed reservation.
    pub fn record_confirmed(seats: u32, duration: Duration) {
        counter!("reservations_total", "outcome" => "confirmed").increment(1);
        counter!("reservation_seats_booked_total").increment(u64::from(seats));
        histogram!("reservation_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a rejected reservation, labelled with its error code.
    pub fn record_rejected(code: &'static str, duration: Duration) {
        counter!("reservations_total", "outcome" => code).increment(1);
        histogram!("reservation_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a commit lost to a concurrent writer.
    pub fn record_conflict() {
        counter!("reservation_conflicts_total").increment(1);
    }
}

/// Catalog metrics recorder.
pub struct CatalogMetrics;

impl CatalogMetrics {
    /// Record a published event.
    pub fn record_published() {
        counter!("events_published_total").increment(1);
    }
}
