//! Pull-free observability for pricecast
//!
//! Metrics live in a per-service Prometheus registry and are rendered on
//! demand (the CLI prints them to stderr when enabled). Nothing listens on a
//! socket.

pub mod metrics;

pub use metrics::ForecastMetrics;
