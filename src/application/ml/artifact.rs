use super::scaler::{HorizonScalers, MinMaxScaler};
use super::sequence_regressor::{SequenceModel, SequenceUnavailable};
use super::tree_regressor::TreeRegressor;
use crate::application::features::FeatureTable;
use crate::config::{ForecastConfig, TargetEncoding};
use crate::domain::errors::ForecastError;
use crate::domain::forecasting::{Horizon, TargetPair};
use crate::domain::ml::FeatureLayout;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Everything needed to forecast a symbol without retraining: both models,
/// the scalers they were fit with, and the layout they expect.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub symbol: String,
    pub horizons: Vec<Horizon>,
    pub feature_columns: Vec<String>,
    pub target_encoding: TargetEncoding,
    pub feature_scaler: MinMaxScaler,
    pub target_scalers: HorizonScalers,
    pub tree: TreeRegressor,
    pub sequence: SequenceModel,
    pub training_rows: usize,
    pub created_at: DateTime<Utc>,
}

/// Scaled outputs of both models for the latest row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledPredictions {
    pub tree: [f64; 2],
    pub sequence: Option<[f64; 2]>,
}

/// Persistence port for artifacts, one per symbol.
pub trait ModelRepository: Send + Sync {
    /// `Ok(None)` when nothing is stored. Unreadable, corrupt or incompatible
    /// data is a `ModelStoreIo` error.
    fn load_or_none(&self, symbol: &str) -> Result<Option<ModelArtifact>, ForecastError>;

    /// Replaces whatever is stored for `artifact.symbol`.
    fn save(&self, artifact: &ModelArtifact) -> Result<(), ForecastError>;
}

impl ModelArtifact {
    /// Fits scalers, the tree model and (when enabled) the sequence model on
    /// the labelled rows of `table`.
    pub fn train(
        symbol: &str,
        table: &FeatureTable,
        config: &ForecastConfig,
    ) -> Result<Self, ForecastError> {
        table.require_training_rows(config.min_training_rows)?;

        let started = Instant::now();
        let layout = config.feature_layout();
        let matrix = table.matrix(&layout);
        let (rows, targets) = table.training_pairs();
        let labelled = rows.len();

        let encoded: Vec<TargetPair> = match config.target_encoding {
            TargetEncoding::Relative => rows
                .iter()
                .zip(&targets)
                .map(|(row, target)| target.offsets_from(row.close))
                .collect(),
            TargetEncoding::Absolute => targets,
        };

        let feature_scaler = MinMaxScaler::fit(&matrix[..labelled])?;
        let target_scalers = HorizonScalers::fit(&encoded)?;

        let scaled_rows = feature_scaler.transform_all(&matrix);
        let scaled_targets: Vec<[f64; 2]> =
            encoded.iter().map(|t| target_scalers.transform(t)).collect();

        let tree_input: &[Vec<f64>] = if config.scaled_tree_input {
            &scaled_rows[..labelled]
        } else {
            &matrix[..labelled]
        };

        let fit_tree = || {
            TreeRegressor::fit(
                tree_input,
                &scaled_targets,
                &config.tree,
                config.scaled_tree_input,
            )
        };
        let fit_sequence = || {
            SequenceModel::train(
                &scaled_rows,
                &scaled_targets,
                &config.sequence,
                config.sequence_enabled,
            )
        };

        let (tree, sequence) = if config.parallel_training {
            rayon::join(fit_tree, fit_sequence)
        } else {
            (fit_tree(), fit_sequence())
        };

        let artifact = Self {
            symbol: symbol.to_string(),
            horizons: Horizon::ALL.to_vec(),
            feature_columns: layout.columns().iter().map(|c| c.to_string()).collect(),
            target_encoding: config.target_encoding,
            feature_scaler,
            target_scalers,
            tree: tree?,
            sequence: sequence?,
            training_rows: labelled,
            created_at: Utc::now(),
        };

        info!(
            symbol,
            rows = labelled,
            sequence = artifact.sequence.is_present(),
            "Trained models in {:.2}s",
            started.elapsed().as_secs_f64()
        );
        Ok(artifact)
    }

    /// Checks that this artifact can serve the current layout and settings.
    /// Returns the first mismatch found.
    pub fn compatibility_issue(&self, config: &ForecastConfig) -> Option<String> {
        let layout = config.feature_layout();
        let expected: Vec<&str> = layout.columns();

        if self.feature_columns != expected {
            return Some(format!(
                "feature columns {:?} differ from {:?}",
                self.feature_columns, expected
            ));
        }
        if self.feature_scaler.width() != layout.width() {
            return Some(format!(
                "feature scaler width {} differs from {}",
                self.feature_scaler.width(),
                layout.width()
            ));
        }
        if self.horizons != Horizon::ALL {
            return Some(format!("horizons {:?} differ from {:?}", self.horizons, Horizon::ALL));
        }
        if self.target_encoding != config.target_encoding {
            return Some(format!(
                "target encoding {:?} differs from {:?}",
                self.target_encoding, config.target_encoding
            ));
        }
        if self.tree.uses_scaled_input() != config.scaled_tree_input {
            return Some("tree input scaling differs".to_string());
        }
        match &self.sequence {
            SequenceModel::Present(model) if model.window() != config.sequence.window => Some(format!(
                "sequence window {} differs from {}",
                model.window(),
                config.sequence.window
            )),
            SequenceModel::Absent(SequenceUnavailable::Disabled) if config.sequence_enabled => {
                Some("sequence model was disabled at training time".to_string())
            }
            _ => None,
        }
    }

    /// Runs both models on the latest row of `table`.
    ///
    /// A sequence model that cannot produce a prediction degrades to `None`.
    pub fn predict(
        &self,
        table: &FeatureTable,
        layout: &FeatureLayout,
        use_sequence: bool,
    ) -> Result<ScaledPredictions, ForecastError> {
        let latest = layout.to_vector(table.latest());
        let tree_input = if self.tree.uses_scaled_input() {
            self.feature_scaler.transform(&latest)
        } else {
            latest
        };
        let tree = self.tree.predict(&tree_input)?;

        let sequence = if use_sequence && self.sequence.is_present() {
            let scaled_rows = self.feature_scaler.transform_all(&table.matrix(layout));
            match self.sequence.predict_latest(&scaled_rows) {
                Ok(prediction) => prediction,
                Err(e) => {
                    warn!(symbol = %self.symbol, "Sequence model unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(ScaledPredictions { tree, sequence })
    }
}
