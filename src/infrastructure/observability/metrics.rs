//! Prometheus metrics definitions for pricecast
//!
//! All metrics use the `pricecast_` prefix. Each instance owns its registry,
//! so independent services (and tests) never share counters.

use prometheus::{CounterVec, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus metrics for the forecasting pipeline
#[derive(Clone)]
pub struct ForecastMetrics {
    registry: Arc<Registry>,
    /// Model trainings per symbol
    pub trainings_total: CounterVec,
    /// Requests served from a stored artifact
    pub cache_hits_total: IntCounter,
    /// Artifacts that could not be loaded or saved
    pub artifact_failures_total: CounterVec,
    /// Forecast requests by outcome (ok / error kind)
    pub forecasts_total: CounterVec,
    /// Wall time of a full training run
    pub training_seconds: Histogram,
}

impl ForecastMetrics {
    /// Create a new ForecastMetrics instance with all counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let trainings_total = CounterVec::new(
            Opts::new("pricecast_trainings_total", "Model trainings by symbol"),
            &["symbol"],
        )?;
        registry.register(Box::new(trainings_total.clone()))?;

        let cache_hits_total = IntCounter::with_opts(Opts::new(
            "pricecast_cache_hits_total",
            "Forecasts served from a stored artifact",
        ))?;
        registry.register(Box::new(cache_hits_total.clone()))?;

        let artifact_failures_total = CounterVec::new(
            Opts::new(
                "pricecast_artifact_failures_total",
                "Artifact load/save failures by operation",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(artifact_failures_total.clone()))?;

        let forecasts_total = CounterVec::new(
            Opts::new("pricecast_forecasts_total", "Forecast requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(forecasts_total.clone()))?;

        let training_seconds = Histogram::with_opts(
            HistogramOpts::new("pricecast_training_seconds", "Training duration in seconds")
                .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;
        registry.register(Box::new(training_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            trainings_total,
            cache_hits_total,
            artifact_failures_total,
            forecasts_total,
            training_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    /// Record a completed training run
    pub fn record_training(&self, symbol: &str, seconds: f64) {
        self.trainings_total.with_label_values(&[symbol]).inc();
        self.training_seconds.observe(seconds);
    }

    /// Trainings across all symbols
    pub fn training_count(&self) -> u64 {
        self.training_seconds.get_sample_count()
    }

    pub fn inc_cache_hit(&self) {
        self.cache_hits_total.inc();
    }

    pub fn inc_artifact_failure(&self, operation: &str) {
        self.artifact_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn inc_forecast(&self, outcome: &str) {
        self.forecasts_total.with_label_values(&[outcome]).inc();
    }
}
