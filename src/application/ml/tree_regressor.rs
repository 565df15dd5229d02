use crate::config::TreeConfig;
use crate::domain::errors::ForecastError;
use crate::domain::forecasting::Horizon;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fmt;
use tracing::info;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

const MODEL_NAME: &str = "random-forest";

/// Two independent random forests, one per horizon, treated as a single
/// model producing a 2-vector of scaled targets.
///
/// Bootstrap sampling is seeded from [`TreeConfig::seed`], so the same rows
/// and configuration always grow the same forests.
#[derive(Serialize, Deserialize)]
pub struct TreeRegressor {
    next_day: Forest,
    next_week: Forest,
    scaled_input: bool,
}

impl TreeRegressor {
    /// Fits both forests on all rows. There is no hold-out split.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[[f64; 2]],
        config: &TreeConfig,
        scaled_input: bool,
    ) -> Result<Self, ForecastError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ForecastError::model(
                MODEL_NAME,
                format!("{} feature rows vs {} targets", x.len(), y.len()),
            ));
        }

        let x_matrix = DenseMatrix::from_2d_vec(&x.to_vec())
            .map_err(|e| ForecastError::model(MODEL_NAME, format!("Matrix error: {}", e)))?;

        info!(
            "Training Random Forest Regressor pair (Rows: {}, Trees: {}, Depth: {}, MinSplit: {}, Seed: {})",
            x.len(),
            config.n_trees,
            config.max_depth,
            config.min_samples_split,
            config.seed
        );

        let fit_horizon = |horizon: Horizon| -> Result<Forest, ForecastError> {
            let targets: Vec<f64> = y.iter().map(|pair| pair[horizon.index()]).collect();
            let params = RandomForestRegressorParameters::default()
                .with_n_trees(config.n_trees)
                .with_max_depth(config.max_depth)
                .with_min_samples_split(config.min_samples_split)
                .with_seed(config.seed);
            RandomForestRegressor::fit(&x_matrix, &targets, params).map_err(|e| {
                ForecastError::model(MODEL_NAME, format!("Training error ({}): {}", horizon, e))
            })
        };

        Ok(Self {
            next_day: fit_horizon(Horizon::NextDay)?,
            next_week: fit_horizon(Horizon::NextWeek)?,
            scaled_input,
        })
    }

    /// Whether the forests were fit on min-max scaled rows.
    pub fn uses_scaled_input(&self) -> bool {
        self.scaled_input
    }

    /// Predicts scaled (next-day, next-week) targets for one feature row.
    pub fn predict(&self, row: &[f64]) -> Result<[f64; 2], ForecastError> {
        let input = DenseMatrix::from_2d_vec(&vec![row.to_vec()])
            .map_err(|e| ForecastError::model(MODEL_NAME, format!("Matrix creation failed: {}", e)))?;

        let predict_one = |forest: &Forest, horizon: Horizon| -> Result<f64, ForecastError> {
            let predictions = forest.predict(&input).map_err(|e| {
                ForecastError::model(MODEL_NAME, format!("Prediction failed ({}): {}", horizon, e))
            })?;
            predictions
                .first()
                .copied()
                .ok_or_else(|| ForecastError::model(MODEL_NAME, "No prediction returned"))
        };

        Ok([
            predict_one(&self.next_day, Horizon::NextDay)?,
            predict_one(&self.next_week, Horizon::NextWeek)?,
        ])
    }
}

impl fmt::Debug for TreeRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeRegressor")
            .field("scaled_input", &self.scaled_input)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TreeConfig {
        TreeConfig {
            n_trees: 8,
            max_depth: 6,
            min_samples_split: 2,
            seed: 7,
        }
    }

    fn training_set() -> (Vec<Vec<f64>>, Vec<[f64; 2]>) {
        let x: Vec<Vec<f64>> = (0..60)
            .map(|i| {
                let v = i as f64 / 59.0;
                vec![v, 1.0 - v, (v * 3.0).sin()]
            })
            .collect();
        let y = x.iter().map(|r| [r[0], r[0] * 0.5]).collect();
        (x, y)
    }

    #[test]
    fn test_fit_and_predict_tracks_target() {
        let (x, y) = training_set();
        let model = TreeRegressor::fit(&x, &y, &small_config(), true).unwrap();

        let low = model.predict(&[0.05, 0.95, 0.15]).unwrap();
        let high = model.predict(&[0.95, 0.05, 0.3]).unwrap();
        assert!(high[0] > low[0]);
        assert!(high[1] > low[1]);
        assert!(model.uses_scaled_input());
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = training_set();
        let a = TreeRegressor::fit(&x, &y, &small_config(), true).unwrap();
        let b = TreeRegressor::fit(&x, &y, &small_config(), true).unwrap();

        for sample in [[0.2, 0.8, 0.5], [0.7, 0.3, 0.9]] {
            assert_eq!(a.predict(&sample).unwrap(), b.predict(&sample).unwrap());
        }
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let (x, y) = training_set();
        let err = TreeRegressor::fit(&x, &y[..10], &small_config(), false).unwrap_err();
        assert!(matches!(err, ForecastError::Model { .. }));
    }

    #[test]
    fn test_serde_roundtrip_preserves_predictions() {
        let (x, y) = training_set();
        let model = TreeRegressor::fit(&x, &y, &small_config(), true).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: TreeRegressor = serde_json::from_str(&json).unwrap();

        let sample = [0.33, 0.67, 0.2];
        assert_eq!(model.predict(&sample).unwrap(), restored.predict(&sample).unwrap());
    }
}
