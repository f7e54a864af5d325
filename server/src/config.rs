//! Configuration management for the weOut server.
//!
//! Loads configuration from environment variables (and a `.env` file, if
//! present) with sensible defaults. Malformed values are errors rather than
//! silently replaced by defaults.
//!
//! | Variable                       | Default                                        |
//! |--------------------------------|------------------------------------------------|
//! | `HOST`                         | `0.0.0.0`                                      |
//! | `PORT`                         | `8080`                                         |
//! | `RUST_LOG`                     | `info,weout=debug,sqlx=warn`                   |
//! | `METRICS_ENABLED`              | `true`                                         |
//! | `STORE_BACKEND`                | `memory` (`memory` or `postgres`)              |
//! | `DATABASE_URL`                 | required when `STORE_BACKEND=postgres`         |
//! | `DATABASE_MAX_CONNECTIONS`     | `10`                                           |
//! | `DATABASE_CONNECT_RETRIES`     | `10`                                           |
//! | `RESERVATION_MAX_RETRIES`      | `16`                                           |
//! | `RESERVATION_INITIAL_DELAY_MS` | `5`                                            |
//! | `RESERVATION_MAX_DELAY_MS`     | `250`                                          |
//! | `RESERVATION_BACKOFF_MULTIPLIER` | `2.0`                                        |
//! | `RESERVATION_BACKOFF_JITTER`   | `0.5`                                          |

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use weout_runtime::RetryPolicy;

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "info,weout=debug,sqlx=warn";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to a value that cannot be parsed.
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Environment variable
        key: &'static str,
        /// Raw value
        value: String,
        /// Parse error
        reason: String,
    },

    /// A required variable is missing.
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Which store backs the services
    pub store: StoreBackend,
    /// `PostgreSQL` configuration (used when `store` is `Postgres`)
    pub postgres: PostgresConfig,
    /// Reservation conflict retry configuration
    pub reservations: ReservationConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Tracing filter directive
    pub log_level: String,
    /// Whether to install the Prometheus recorder and serve `/metrics`
    pub metrics_enabled: bool,
}

impl ServerConfig {
    /// `host:port` bind address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store; data is lost on restart
    Memory,
    /// `PostgreSQL`
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!("unknown store backend {other:?}, expected memory or postgres")),
        }
    }
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// `PostgreSQL` connection URL
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection attempts at startup before giving up
    pub connect_retries: usize,
}

/// Reservation conflict retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationConfig {
    /// Retries after the first lost commit
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Delay cap
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
    /// Random jitter fraction
    pub jitter: f64,
}

impl ReservationConfig {
    /// Retry policy for the reservation service.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.max_retries)
            .initial_delay(self.initial_delay)
            .max_delay(self.max_delay)
            .multiplier(self.multiplier)
            .jitter(self.jitter)
            .build()
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or a required one is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Absent .env files are normal outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or a required one is missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = RetryPolicy::default();

        let config = Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 8080)?,
                log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                metrics_enabled: parse_or(&lookup, "METRICS_ENABLED", true)?,
            },
            store: parse_or(&lookup, "STORE_BACKEND", StoreBackend::Memory)?,
            postgres: PostgresConfig {
                url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
                connect_retries: parse_or(&lookup, "DATABASE_CONNECT_RETRIES", 10)?,
            },
            reservations: ReservationConfig {
                max_retries: parse_or(&lookup, "RESERVATION_MAX_RETRIES", defaults.max_retries)?,
                initial_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "RESERVATION_INITIAL_DELAY_MS",
                    millis(defaults.initial_delay),
                )?),
                max_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "RESERVATION_MAX_DELAY_MS",
                    millis(defaults.max_delay),
                )?),
                multiplier: parse_or(&lookup, "RESERVATION_BACKOFF_MULTIPLIER", defaults.multiplier)?,
                jitter: parse_or(&lookup, "RESERVATION_BACKOFF_JITTER", defaults.jitter)?,
            },
        };

        if config.store == StoreBackend::Postgres && config.postgres.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(config)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
