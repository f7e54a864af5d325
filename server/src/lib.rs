//! weOut reservation server.
//!
//! Wires the configured store, the reservation and catalog services and the
//! HTTP router into a runnable binary. See [`config`] for the environment
//! variables it reads.

pub mod config;

pub use config::{Config, ConfigError, ServerConfig, StoreBackend};

use tokio::net::TcpListener;

/// Bind the HTTP listener. `HOST` may be an IP address or a hostname.
///
/// # Errors
///
/// Returns the I/O error if the address cannot be resolved or bound.
pub async fn bind_listener(server: &ServerConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind((server.host.as_str(), server.port)).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use weout_runtime::metrics::MetricsServer;

    fn server_config(host: &str) -> ServerConfig {
        ServerConfig {
            host: host.to_string(),
            port: 0,
            log_level: config::DEFAULT_LOG_FILTER.to_string(),
            metrics_enabled: true,
        }
    }

    #[tokio::test]
    async fn hostname_host_binds_and_feeds_metrics_address() {
        let listener = bind_listener(&server_config("localhost")).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);

        let metrics = MetricsServer::new(addr);
        assert!(metrics.render().is_none());
    }

    #[tokio::test]
    async fn ip_host_binds() {
        let listener = bind_listener(&server_config("127.0.0.1")).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }
}
