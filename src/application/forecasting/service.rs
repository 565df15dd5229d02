use crate::application::features::{FeatureTable, expected_move};
use crate::application::ml::{ConfidenceEstimator, EnsembleCombiner, ModelArtifact, ModelRepository};
use crate::config::{ForecastConfig, ModelPolicy};
use crate::domain::errors::ForecastError;
use crate::domain::forecasting::{
    ForecastFailure, ForecastOutcome, ForecastReport, ForecastStage, IndicatorSnapshot,
    ModelSource, StageTracker,
};
use crate::domain::market::{PriceBar, normalize_symbol, validate_series};
use crate::domain::market::price_bar::closes;
use crate::domain::ml::FeatureRow;
use crate::domain::ports::PriceHistoryProvider;
use crate::domain::sentiment::NEUTRAL_SENTIMENT;
use crate::infrastructure::observability::ForecastMetrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Input of one forecast.
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub symbol: String,
    /// Daily bars, oldest first.
    pub bars: Vec<PriceBar>,
    /// Aggregate news sentiment in [0, 1]; neutral when absent.
    pub sentiment: Option<f64>,
}

impl ForecastRequest {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
            sentiment: None,
        }
    }

    pub fn with_sentiment(mut self, sentiment: f64) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    /// Uses the fetched sentiment, or neutral when the source failed.
    pub fn with_sentiment_or_neutral(self, sentiment: Result<f64, ForecastError>) -> Self {
        match sentiment {
            Ok(score) => self.with_sentiment(score),
            Err(e) => {
                warn!(symbol = %self.symbol, "Sentiment unavailable, using neutral: {}", e);
                self.with_sentiment(NEUTRAL_SENTIMENT)
            }
        }
    }
}

/// Result of an explicit training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub symbol: String,
    pub training_rows: usize,
    pub feature_columns: Vec<String>,
    pub sequence_trained: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&ModelArtifact> for TrainingReport {
    fn from(artifact: &ModelArtifact) -> Self {
        Self {
            symbol: artifact.symbol.clone(),
            training_rows: artifact.training_rows,
            feature_columns: artifact.feature_columns.clone(),
            sequence_trained: artifact.sequence.is_present(),
            created_at: artifact.created_at,
        }
    }
}

/// Runs requests through features, models, ensemble and confidence.
///
/// Requests are independent and the service can be shared across threads;
/// the store serializes writes for the same symbol.
pub struct ForecastService {
    config: ForecastConfig,
    store: Arc<dyn ModelRepository>,
    metrics: ForecastMetrics,
}

impl ForecastService {
    pub fn new(config: ForecastConfig, store: Arc<dyn ModelRepository>) -> anyhow::Result<Self> {
        Ok(Self::with_metrics(config, store, ForecastMetrics::new()?))
    }

    /// The sequence capability is fixed here: without the `sequence-model`
    /// feature it is off whatever the configuration says.
    pub fn with_metrics(
        mut config: ForecastConfig,
        store: Arc<dyn ModelRepository>,
        metrics: ForecastMetrics,
    ) -> Self {
        config.sequence_enabled = config.sequence_enabled && cfg!(feature = "sequence-model");
        info!(
            policy = %config.model_policy,
            sequence = config.sequence_enabled,
            "Forecast service ready"
        );
        Self {
            config,
            store,
            metrics,
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn metrics(&self) -> &ForecastMetrics {
        &self.metrics
    }

    pub fn sequence_available(&self) -> bool {
        self.config.sequence_enabled
    }

    /// Trainings performed by this service so far.
    pub fn training_count(&self) -> u64 {
        self.metrics.training_count()
    }

    /// Forecasts one request. Failures come back as values, never panics.
    pub fn forecast(&self, request: &ForecastRequest) -> ForecastOutcome {
        self.forecast_tracked(request).0
    }

    fn forecast_tracked(&self, request: &ForecastRequest) -> (ForecastOutcome, StageTracker) {
        let mut tracker = StageTracker::new(&request.symbol);

        let outcome = match self.run(request, &mut tracker) {
            Ok(report) => {
                advance(&mut tracker, ForecastStage::Emitted);
                debug!(symbol = %report.symbol, trail = ?tracker.trail(), "Forecast emitted");
                self.metrics.inc_forecast("ok");
                ForecastOutcome::Ok(report)
            }
            Err(e) => self.failed(&request.symbol, &mut tracker, &e),
        };
        (outcome, tracker)
    }

    /// Fetches history from `provider` and forecasts it.
    pub fn forecast_from(
        &self,
        provider: &dyn PriceHistoryProvider,
        symbol: &str,
        sentiment: Option<f64>,
    ) -> ForecastOutcome {
        let symbol = match normalize_symbol(symbol) {
            Ok(normalized) => normalized,
            Err(e) => return self.failed(symbol, &mut StageTracker::new(symbol), &e),
        };
        let symbol = symbol.as_str();

        match provider.fetch_history(symbol) {
            Ok(bars) => {
                let mut request = ForecastRequest::new(symbol, bars);
                request.sentiment = sentiment;
                self.forecast(&request)
            }
            Err(e) => {
                let mut tracker = StageTracker::new(symbol);
                self.failed(symbol, &mut tracker, &e)
            }
        }
    }

    /// Trains and stores a fresh artifact regardless of the model policy.
    /// Unlike the forecast path, a failed save is an error here.
    pub fn train(&self, symbol: &str, bars: &[PriceBar]) -> Result<TrainingReport, ForecastError> {
        let symbol = normalize_symbol(symbol)?;
        validate_series(bars)?;
        let table = FeatureTable::build(bars)?;
        let artifact = self.fit(&symbol, &table)?;
        self.store.save(&artifact).inspect_err(|_| {
            self.metrics.inc_artifact_failure("save");
        })?;
        Ok(TrainingReport::from(&artifact))
    }

    fn failed(
        &self,
        symbol: &str,
        tracker: &mut StageTracker,
        error: &ForecastError,
    ) -> ForecastOutcome {
        advance(tracker, ForecastStage::Failed(error.kind()));
        warn!(symbol, kind = %error.kind(), "Forecast failed: {}", error);
        debug!(symbol, trail = ?tracker.trail(), "Forecast stages");
        self.metrics.inc_forecast(&error.kind().to_string());
        ForecastOutcome::Failed(ForecastFailure::from_error(symbol, error))
    }

    fn run(
        &self,
        request: &ForecastRequest,
        tracker: &mut StageTracker,
    ) -> Result<ForecastReport, ForecastError> {
        let symbol = normalize_symbol(&request.symbol)?;
        let symbol = symbol.as_str();
        validate_series(&request.bars)?;
        let sentiment = match request.sentiment {
            Some(s) if !(0.0..=1.0).contains(&s) => {
                return Err(ForecastError::InvalidInput {
                    reason: format!("sentiment {} outside [0, 1]", s),
                });
            }
            Some(s) => s,
            None => NEUTRAL_SENTIMENT,
        };
        advance(tracker, ForecastStage::Validated);

        let table = FeatureTable::build(&request.bars)?;
        advance(tracker, ForecastStage::FeaturesBuilt);

        let (artifact, source) = self.obtain_artifact(symbol, &table)?;
        advance(tracker, match source {
            ModelSource::Cached => ForecastStage::Cached,
            ModelSource::Trained => ForecastStage::Trained,
        });

        let layout = self.config.feature_layout();
        let predictions = artifact.predict(&table, &layout, self.config.sequence_enabled)?;
        advance(tracker, ForecastStage::Predicted);

        let latest = *table.latest();
        let combined = EnsembleCombiner::new(
            &artifact.target_scalers,
            self.config.target_encoding,
            self.config.price_clamp,
        )
        .combine(predictions.tree, predictions.sequence, latest.close);
        advance(tracker, ForecastStage::Combined);

        let confidence = ConfidenceEstimator::new(self.config.confidence).estimate(
            predictions.tree,
            predictions.sequence,
            latest.rsi,
            sentiment,
        );
        advance(tracker, ForecastStage::Confidenced);

        let expected = expected_move(&closes(&request.bars), self.config.expected_move_window)
            .unwrap_or(0.0);

        info!(
            symbol,
            source = ?source,
            next_day = combined.forecast.next_day,
            next_week = combined.forecast.next_week,
            confidence,
            "Forecast ready"
        );

        Ok(ForecastReport {
            symbol: symbol.to_string(),
            forecast: combined.forecast,
            indicators: snapshot(&latest, sentiment),
            expected_move: expected,
            confidence,
            latest_close: latest.close,
            model_source: source,
            sequence_used: predictions.sequence.is_some(),
            generated_at: Utc::now(),
        })
    }

    /// Reuses the stored artifact under `cache-models` when it loads and fits
    /// the current layout; otherwise trains a new one.
    fn obtain_artifact(
        &self,
        symbol: &str,
        table: &FeatureTable,
    ) -> Result<(ModelArtifact, ModelSource), ForecastError> {
        if self.config.model_policy == ModelPolicy::CacheModels {
            match self.store.load_or_none(symbol) {
                Ok(Some(artifact)) => match artifact.compatibility_issue(&self.config) {
                    None => {
                        info!(symbol, "Using cached models");
                        self.metrics.inc_cache_hit();
                        return Ok((artifact, ModelSource::Cached));
                    }
                    Some(issue) => {
                        warn!(symbol, "Stored artifact incompatible ({}), retraining", issue);
                        self.metrics.inc_artifact_failure("incompatible");
                    }
                },
                Ok(None) => {}
                Err(ForecastError::InvalidInput { reason }) => {
                    return Err(ForecastError::InvalidInput { reason });
                }
                Err(e) => {
                    warn!(symbol, "Stored artifact unusable ({}), retraining", e);
                    self.metrics.inc_artifact_failure("load");
                }
            }
        }

        let artifact = self.fit(symbol, table)?;
        if let Err(e) = self.store.save(&artifact) {
            warn!(symbol, "Could not persist artifact: {}", e);
            self.metrics.inc_artifact_failure("save");
        }
        Ok((artifact, ModelSource::Trained))
    }

    fn fit(&self, symbol: &str, table: &FeatureTable) -> Result<ModelArtifact, ForecastError> {
        let started = Instant::now();
        let artifact = ModelArtifact::train(symbol, table, &self.config)?;
        self.metrics
            .record_training(symbol, started.elapsed().as_secs_f64());
        Ok(artifact)
    }
}

/// Stages only ever move forward in `run`; a rejected step is a bug worth seeing.
fn advance(tracker: &mut StageTracker, next: ForecastStage) {
    if !tracker.advance(next) {
        warn!(
            "Stage {:?} -> {:?} rejected, trail {:?}",
            tracker.current(),
            next,
            tracker.trail()
        );
    }
}

fn snapshot(row: &FeatureRow, sentiment: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        rsi: row.rsi,
        macd: row.macd,
        macd_signal: row.macd_signal,
        sma20: row.sma_20,
        sma50: row.sma_50,
        sma200: row.sma_200,
        bb_upper: row.bb_upper,
        bb_middle: row.bb_middle,
        bb_lower: row.bb_lower,
        sentiment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SequenceConfig, TreeConfig};
    use crate::domain::errors::ErrorKind;
    use crate::infrastructure::persistence::InMemoryModelStore;
    use chrono::{Duration, NaiveDate};
    use rust_decimal::Decimal;

    fn bars(n: usize) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        (0..n)
            .map(|i| {
                let close = 50.0 + i as f64 * 0.25 + ((i as f64) * 0.7).sin();
                PriceBar::flat(
                    start + Duration::days(i as i64),
                    Decimal::from_f64_retain(close).unwrap().round_dp(4),
                )
            })
            .collect()
    }

    fn fast_config() -> ForecastConfig {
        ForecastConfig {
            min_training_rows: 50,
            tree: TreeConfig {
                n_trees: 5,
                max_depth: 6,
                ..TreeConfig::default()
            },
            sequence: SequenceConfig {
                window: 10,
                hidden_size: 4,
                epochs: 1,
                ..SequenceConfig::default()
            },
            ..ForecastConfig::default()
        }
    }

    fn service(config: ForecastConfig) -> (ForecastService, Arc<InMemoryModelStore>) {
        let store = Arc::new(InMemoryModelStore::new());
        let service = ForecastService::new(config, store.clone()).unwrap();
        (service, store)
    }

    #[test]
    fn test_first_forecast_trains_then_caches() {
        let (service, store) = service(fast_config());
        let request = ForecastRequest::new("AAPL", bars(280));

        let ForecastOutcome::Ok(first) = service.forecast(&request) else {
            panic!("first forecast failed");
        };
        assert_eq!(first.model_source, ModelSource::Trained);
        assert_eq!(store.len(), 1);

        let ForecastOutcome::Ok(second) = service.forecast(&request) else {
            panic!("second forecast failed");
        };
        assert_eq!(second.model_source, ModelSource::Cached);
        assert_eq!(service.training_count(), 1);
        assert_eq!(first.forecast, second.forecast);
        assert_eq!(first.confidence, second.confidence);
    }

    #[test]
    fn test_sentiment_defaults_to_neutral() {
        let (service, _) = service(fast_config());
        let ForecastOutcome::Ok(report) = service.forecast(&ForecastRequest::new("AAPL", bars(280)))
        else {
            panic!("forecast failed");
        };
        assert_eq!(report.indicators.sentiment, 0.5);
        assert!((0.0..=1.0).contains(&report.confidence));
        assert!(report.expected_move > 0.0);
    }

    #[test]
    fn test_out_of_range_sentiment_is_invalid_input() {
        let (service, _) = service(fast_config());
        let request = ForecastRequest::new("AAPL", bars(280)).with_sentiment(1.5);
        let ForecastOutcome::Failed(failure) = service.forecast(&request) else {
            panic!("expected failure");
        };
        assert_eq!(failure.error_kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn test_sentiment_fallback() {
        let request = ForecastRequest::new("AAPL", Vec::new()).with_sentiment_or_neutral(Err(
            ForecastError::UpstreamDataUnavailable {
                symbol: "AAPL".to_string(),
                reason: "timeout".to_string(),
            },
        ));
        assert_eq!(request.sentiment, Some(0.5));

        let request = ForecastRequest::new("AAPL", Vec::new()).with_sentiment_or_neutral(Ok(0.8));
        assert_eq!(request.sentiment, Some(0.8));
    }

    #[test]
    fn test_short_history_fails_without_training() {
        let (service, store) = service(fast_config());
        let ForecastOutcome::Failed(failure) = service.forecast(&ForecastRequest::new("AAPL", bars(120)))
        else {
            panic!("expected failure");
        };
        assert_eq!(failure.error_kind, ErrorKind::InsufficientHistory);
        assert_eq!(service.training_count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_artifact_is_replaced() {
        let (service, store) = service(fast_config());
        store.insert_raw("AAPL", "garbage");

        let outcome = service.forecast(&ForecastRequest::new("AAPL", bars(280)));
        let ForecastOutcome::Ok(report) = outcome else {
            panic!("forecast failed");
        };
        assert_eq!(report.model_source, ModelSource::Trained);
        assert!(store.load_or_none("AAPL").unwrap().is_some());
    }

    #[test]
    fn test_layout_change_forces_retrain() {
        let store = Arc::new(InMemoryModelStore::new());
        let first = ForecastService::new(fast_config(), store.clone()).unwrap();
        assert!(first.forecast(&ForecastRequest::new("AAPL", bars(280))).is_ok());

        let narrower = ForecastConfig {
            include_macd_signal: false,
            ..fast_config()
        };
        let second = ForecastService::new(narrower, store).unwrap();
        let ForecastOutcome::Ok(report) = second.forecast(&ForecastRequest::new("AAPL", bars(280)))
        else {
            panic!("forecast failed");
        };
        assert_eq!(report.model_source, ModelSource::Trained);
    }

    #[test]
    fn test_explicit_train_stores_artifact() {
        let (service, store) = service(fast_config());
        let report = service.train("MSFT", &bars(280)).unwrap();
        assert_eq!(report.symbol, "MSFT");
        assert_eq!(report.training_rows, 76);
        assert_eq!(report.feature_columns.len(), 9);
        assert!(store.load_or_none("MSFT").unwrap().is_some());
        assert_eq!(service.training_count(), 1);
    }

    #[test]
    fn test_symbol_case_shares_cached_artifact() {
        let (service, store) = service(fast_config());
        assert!(service.forecast(&ForecastRequest::new("AAPL", bars(280))).is_ok());

        let ForecastOutcome::Ok(report) = service.forecast(&ForecastRequest::new(" aapl", bars(280)))
        else {
            panic!("forecast failed");
        };
        assert_eq!(report.symbol, "AAPL");
        assert_eq!(report.model_source, ModelSource::Cached);
        assert_eq!(service.training_count(), 1);
        assert_eq!(store.len(), 1);

        let trained = service.train("msft", &bars(280)).unwrap();
        assert_eq!(trained.symbol, "MSFT");
        assert!(store.load_or_none("MSFT").unwrap().is_some());
    }

    #[test]
    fn test_artifact_without_sequence_retrained_once_enabled() {
        let store = Arc::new(InMemoryModelStore::new());
        let tree_only = ForecastService::new(
            ForecastConfig {
                sequence_enabled: false,
                ..fast_config()
            },
            store.clone(),
        )
        .unwrap();
        let report = tree_only.train("MSFT", &bars(280)).unwrap();
        assert!(!report.sequence_trained);

        let full = ForecastService::new(fast_config(), store).unwrap();
        let ForecastOutcome::Ok(report) = full.forecast(&ForecastRequest::new("MSFT", bars(280)))
        else {
            panic!("forecast failed");
        };
        if full.sequence_available() {
            assert_eq!(report.model_source, ModelSource::Trained);
            assert!(report.sequence_used);
            assert_eq!(full.training_count(), 1);
        } else {
            assert_eq!(report.model_source, ModelSource::Cached);
        }
    }

    #[test]
    fn test_short_history_sequence_artifact_is_reused() {
        let config = ForecastConfig {
            sequence: SequenceConfig {
                window: 500,
                ..fast_config().sequence
            },
            ..fast_config()
        };
        let (service, _) = service(config);
        let request = ForecastRequest::new("AAPL", bars(280));

        assert!(service.forecast(&request).is_ok());
        let ForecastOutcome::Ok(second) = service.forecast(&request) else {
            panic!("second forecast failed");
        };
        assert_eq!(second.model_source, ModelSource::Cached);
        assert!(!second.sequence_used);
        assert_eq!(service.training_count(), 1);
    }

    #[test]
    fn test_stage_trail_for_success_and_failure() {
        use ForecastStage::*;
        let (service, _) = service(fast_config());

        let (outcome, tracker) = service.forecast_tracked(&ForecastRequest::new("AAPL", bars(280)));
        assert!(outcome.is_ok());
        assert_eq!(
            tracker.trail(),
            &[
                Fetched,
                Validated,
                FeaturesBuilt,
                Trained,
                Predicted,
                Combined,
                Confidenced,
                Emitted
            ]
        );

        let (_, tracker) = service.forecast_tracked(&ForecastRequest::new("AAPL", bars(280)));
        assert_eq!(tracker.trail()[3], Cached);

        let (outcome, tracker) = service.forecast_tracked(&ForecastRequest::new("AAPL", bars(120)));
        assert!(!outcome.is_ok());
        assert_eq!(
            tracker.trail(),
            &[Fetched, Validated, Failed(ErrorKind::InsufficientHistory)]
        );
    }
}
