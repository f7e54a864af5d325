//! weOut reservation HTTP server.

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weout_core::ReservationStore;
use weout_core::environment::SystemClock;
use weout_postgres::PostgresReservationStore;
use weout_runtime::RetryPolicy;
use weout_runtime::metrics::MetricsServer;
use weout_runtime::retry::retry_with_backoff;
use weout_server::{Config, StoreBackend, bind_listener};
use weout_testing::InMemoryReservationStore;
use weout_web::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.server.log_level)
                .unwrap_or_else(|_| weout_server::config::DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        bind = %config.server.bind_address(),
        store = ?config.store,
        metrics = config.server.metrics_enabled,
        "Starting weOut reservation server"
    );

    let store = open_store(&config).await?;

    let mut state = AppState::new(
        store,
        Arc::new(SystemClock::new()),
        config.reservations.retry_policy(),
    );

    let listener = bind_listener(&config.server).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "Server listening");

    if config.server.metrics_enabled {
        let mut metrics = MetricsServer::new(addr);
        metrics.start()?;
        match metrics.handle() {
            Some(handle) => state = state.with_metrics(handle.clone()),
            None => warn!("Metrics recorder unavailable, /metrics disabled"),
        }
    }

    let app = build_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Open the configured store, running migrations for `PostgreSQL`.
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ReservationStore>> {
    match config.store {
        StoreBackend::Memory => {
            warn!("Using in-memory store, data is lost on restart");
            Ok(Arc::new(InMemoryReservationStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .postgres
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;

            let policy = RetryPolicy::builder()
                .max_retries(config.postgres.connect_retries)
                .initial_delay(Duration::from_millis(500))
                .max_delay(Duration::from_secs(10))
                .build();

            info!("Connecting to PostgreSQL...");
            let store = retry_with_backoff(policy, || {
                PostgresReservationStore::connect(url, config.postgres.max_connections)
            })
            .await?;

            store.migrate().await?;
            info!("PostgreSQL connected, migrations applied");

            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
