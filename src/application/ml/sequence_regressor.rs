use super::lstm::{LstmNetwork, TrainingSchedule, WindowSample};
use crate::config::SequenceConfig;
use crate::domain::errors::ForecastError;
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

const MODEL_NAME: &str = "lstm";

/// Why a symbol has no sequence model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SequenceUnavailable {
    /// Switched off by configuration or compiled without `sequence-model`.
    Disabled,
    /// Fewer labelled rows than one window.
    ShortHistory { rows: usize, window: usize },
}

impl fmt::Display for SequenceUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::ShortHistory { rows, window } => {
                write!(f, "{} labelled rows < window {}", rows, window)
            }
        }
    }
}

/// LSTM over the last `window` scaled feature rows, emitting scaled
/// (next-day, next-week) targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRegressor {
    network: LstmNetwork,
    window: usize,
}

/// The optional second model of the ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceModel {
    Present(SequenceRegressor),
    Absent(SequenceUnavailable),
}

impl SequenceModel {
    /// Fits the sequence model, or records why none exists.
    ///
    /// `scaled_rows` holds every feature row of the table, already scaled;
    /// the first `scaled_targets.len()` of them are labelled. The sample
    /// ending at row `t` is rows `t-W+1..=t` labelled with the target of `t`.
    pub fn train(
        scaled_rows: &[Vec<f64>],
        scaled_targets: &[[f64; 2]],
        config: &SequenceConfig,
        enabled: bool,
    ) -> Result<Self, ForecastError> {
        if !enabled || !cfg!(feature = "sequence-model") {
            return Ok(Self::Absent(SequenceUnavailable::Disabled));
        }

        let labelled = scaled_targets.len().min(scaled_rows.len());
        if labelled < config.window {
            warn!(
                "Sequence model skipped: {} labelled rows < window {}",
                labelled, config.window
            );
            return Ok(Self::Absent(SequenceUnavailable::ShortHistory {
                rows: labelled,
                window: config.window,
            }));
        }

        let matrix = to_matrix(scaled_rows)?;
        let samples: Vec<WindowSample> = (config.window - 1..labelled)
            .map(|end| WindowSample {
                start: end + 1 - config.window,
                target: scaled_targets[end].to_vec(),
            })
            .collect();

        info!(
            "Training LSTM (Samples: {}, Window: {}, Hidden: {}, Epochs: {}, Seed: {})",
            samples.len(),
            config.window,
            config.hidden_size,
            config.epochs,
            config.seed
        );

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut network = LstmNetwork::new(matrix.ncols(), config.hidden_size, 2, &mut rng);
        let schedule = TrainingSchedule {
            window: config.window,
            epochs: config.epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            clip_norm: config.clip_norm,
        };
        let history = network.fit_windows(&matrix, &samples, &schedule, &mut rng);

        if let Some(last) = history.last() {
            if !last.is_finite() {
                return Err(ForecastError::model(MODEL_NAME, "training diverged (non-finite loss)"));
            }
            info!("LSTM final epoch loss: {:.6}", last);
        }

        Ok(Self::Present(SequenceRegressor {
            network,
            window: config.window,
        }))
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn window(&self) -> Option<usize> {
        match self {
            Self::Present(model) => Some(model.window),
            Self::Absent(_) => None,
        }
    }

    /// Scaled prediction from the `window` rows ending at the latest row.
    ///
    /// `None` when the model is absent or fewer than `window` rows exist.
    pub fn predict_latest(&self, scaled_rows: &[Vec<f64>]) -> Result<Option<[f64; 2]>, ForecastError> {
        let Self::Present(model) = self else {
            return Ok(None);
        };
        model.predict_latest(scaled_rows)
    }
}

impl SequenceRegressor {
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn predict_latest(&self, scaled_rows: &[Vec<f64>]) -> Result<Option<[f64; 2]>, ForecastError> {
        if scaled_rows.len() < self.window {
            return Ok(None);
        }

        let tail = &scaled_rows[scaled_rows.len() - self.window..];
        let matrix = to_matrix(tail)?;
        if matrix.ncols() != self.network.input_size() {
            return Err(ForecastError::model(
                MODEL_NAME,
                format!(
                    "input width {} does not match trained width {}",
                    matrix.ncols(),
                    self.network.input_size()
                ),
            ));
        }

        let output = self.network.predict(matrix.view());
        match output.as_slice() {
            Some([day, week]) => Ok(Some([*day, *week])),
            _ => Err(ForecastError::model(
                MODEL_NAME,
                format!("expected 2 outputs, got {}", output.len()),
            )),
        }
    }
}

fn to_matrix(rows: &[Vec<f64>]) -> Result<Array2<f64>, ForecastError> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), width), flat)
        .map_err(|e| ForecastError::model(MODEL_NAME, format!("Matrix error: {}", e)))
}
