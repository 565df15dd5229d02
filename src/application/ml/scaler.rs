use crate::domain::errors::ForecastError;
use crate::domain::forecasting::{Horizon, TargetPair};
use serde::{Deserialize, Serialize};

/// Per-column min-max affine transform: `(x - min) / (max - min)`.
///
/// Values outside the fitted range are not clamped; they map outside [0, 1].
/// A column with zero range uses a unit scale, so it maps to `x - min`.
/// Instances are immutable once fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl MinMaxScaler {
    /// Fits one min/max pair per column of `rows`.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ForecastError> {
        let width = rows.first().map(Vec::len).ok_or_else(|| ForecastError::InvalidInput {
            reason: "cannot fit scaler on an empty matrix".to_string(),
        })?;

        let mut min = vec![f64::INFINITY; width];
        let mut max = vec![f64::NEG_INFINITY; width];

        for (r, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(ForecastError::InvalidInput {
                    reason: format!("row {} has {} columns, expected {}", r, row.len(), width),
                });
            }
            for (c, &value) in row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(ForecastError::InvalidInput {
                        reason: format!("non-finite value at row {}, column {}", r, c),
                    });
                }
                min[c] = min[c].min(value);
                max[c] = max[c].max(value);
            }
        }

        Ok(Self { min, max })
    }

    /// Fits a single-column scaler.
    pub fn fit_column(values: &[f64]) -> Result<Self, ForecastError> {
        let rows: Vec<Vec<f64>> = values.iter().map(|v| vec![*v]).collect();
        Self::fit(&rows)
    }

    pub fn width(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self) -> &[f64] {
        &self.min
    }

    pub fn max(&self) -> &[f64] {
        &self.max
    }

    fn scale(&self, col: usize) -> f64 {
        let range = self.max[col] - self.min[col];
        if range > 0.0 { range } else { 1.0 }
    }

    pub fn transform_value(&self, col: usize, value: f64) -> f64 {
        (value - self.min[col]) / self.scale(col)
    }

    pub fn inverse_value(&self, col: usize, scaled: f64) -> f64 {
        scaled * self.scale(col) + self.min[col]
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(c, v)| self.transform_value(c, *v))
            .collect()
    }

    pub fn inverse_transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(c, v)| self.inverse_value(c, *v))
            .collect()
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}

/// One single-column scaler per forecast horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonScalers {
    pub next_day: MinMaxScaler,
    pub next_week: MinMaxScaler,
}

impl HorizonScalers {
    pub fn fit(targets: &[TargetPair]) -> Result<Self, ForecastError> {
        let next_day: Vec<f64> = targets.iter().map(|t| t.next_day).collect();
        let next_week: Vec<f64> = targets.iter().map(|t| t.next_week).collect();
        Ok(Self {
            next_day: MinMaxScaler::fit_column(&next_day)?,
            next_week: MinMaxScaler::fit_column(&next_week)?,
        })
    }

    pub fn for_horizon(&self, horizon: Horizon) -> &MinMaxScaler {
        match horizon {
            Horizon::NextDay => &self.next_day,
            Horizon::NextWeek => &self.next_week,
        }
    }

    pub fn transform(&self, target: &TargetPair) -> [f64; 2] {
        Horizon::ALL.map(|h| self.for_horizon(h).transform_value(0, target.get(h)))
    }

    pub fn inverse_transform(&self, scaled: [f64; 2]) -> [f64; 2] {
        Horizon::ALL.map(|h| self.for_horizon(h).inverse_value(0, scaled[h.index()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> Vec<Vec<f64>> {
        vec![
            vec![100.0, 30.0, -1.5],
            vec![150.0, 70.0, 0.5],
            vec![125.0, 50.0, 2.5],
        ]
    }

    #[test]
    fn test_fit_bounds_map_to_unit_interval() {
        let scaler = MinMaxScaler::fit(&matrix()).unwrap();
        assert_eq!(scaler.transform(&[100.0, 30.0, -1.5]), vec![0.0, 0.0, 0.0]);
        assert_eq!(scaler.transform(&[150.0, 70.0, 2.5]), vec![1.0, 1.0, 1.0]);
        assert_eq!(scaler.transform(&[125.0, 50.0, 0.5]), vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_out_of_range_values_not_clamped() {
        let scaler = MinMaxScaler::fit(&matrix()).unwrap();
        let scaled = scaler.transform(&[200.0, 10.0, 0.5]);
        assert_eq!(scaled[0], 2.0);
        assert_eq!(scaled[1], -0.5);
        assert_eq!(scaler.inverse_transform(&scaled), vec![200.0, 10.0, 0.5]);
    }

    #[test]
    fn test_inverse_roundtrip_within_tolerance() {
        let scaler = MinMaxScaler::fit(&matrix()).unwrap();
        for row in matrix() {
            let back = scaler.inverse_transform(&scaler.transform(&row));
            for (a, b) in row.iter().zip(&back) {
                assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
            }
        }
        for x in [101.3, 117.77, 149.999] {
            let back = scaler.inverse_value(0, scaler.transform_value(0, x));
            assert!((x - back).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_column_uses_unit_scale() {
        let scaler = MinMaxScaler::fit_column(&[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(scaler.transform_value(0, 5.0), 0.0);
        assert_eq!(scaler.transform_value(0, 6.0), 1.0);
        assert_eq!(scaler.inverse_value(0, 0.0), 5.0);
    }

    #[test]
    fn test_rejects_empty_ragged_and_nan() {
        assert!(MinMaxScaler::fit(&[]).is_err());
        assert!(MinMaxScaler::fit(&[vec![1.0, 2.0], vec![1.0]]).is_err());
        assert!(MinMaxScaler::fit(&[vec![f64::NAN]]).is_err());
    }

    #[test]
    fn test_horizon_scalers_are_independent() {
        let targets = vec![
            TargetPair {
                next_day: 10.0,
                next_week: 100.0,
            },
            TargetPair {
                next_day: 20.0,
                next_week: 300.0,
            },
        ];
        let scalers = HorizonScalers::fit(&targets).unwrap();
        assert_eq!(scalers.transform(&targets[1]), [1.0, 1.0]);
        assert_eq!(scalers.inverse_transform([0.5, 0.5]), [15.0, 200.0]);
    }
}
