use super::indicators::{IndicatorEngine, WARMUP_BARS};
use crate::domain::errors::ForecastError;
use crate::domain::forecasting::{Horizon, TargetPair};
use crate::domain::market::PriceBar;
use crate::domain::ml::{FeatureLayout, FeatureRow};
use chrono::NaiveDate;
use tracing::debug;

/// Feature rows with their horizon targets, row-aligned.
///
/// Only fully-defined rows are kept. Targets are `None` for the trailing rows
/// whose horizons run past the end of the series; those rows still serve as
/// inference inputs, and the last one is always the inference row.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    dates: Vec<NaiveDate>,
    rows: Vec<FeatureRow>,
    targets: Vec<Option<TargetPair>>,
}

impl FeatureTable {
    /// Runs the indicator engine over `bars` (oldest first).
    pub fn build(bars: &[PriceBar]) -> Result<Self, ForecastError> {
        let closes: Vec<f64> = bars.iter().map(PriceBar::close_f64).collect();
        let mut engine = IndicatorEngine::new()?;

        let mut dates = Vec::new();
        let mut rows = Vec::new();
        let mut targets = Vec::new();

        for (idx, bar) in bars.iter().enumerate() {
            let Some(row) = engine.update(closes[idx]) else {
                continue;
            };
            dates.push(bar.date);
            rows.push(row);
            targets.push(target_at(&closes, idx));
        }

        if rows.is_empty() {
            return Err(ForecastError::InsufficientHistory {
                bars: bars.len(),
                required: WARMUP_BARS,
            });
        }

        debug!(
            bars = bars.len(),
            rows = rows.len(),
            "Built feature table ({} labelled)",
            targets.iter().filter(|t| t.is_some()).count()
        );

        Ok(Self {
            dates,
            rows,
            targets,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The inference row: the most recent session.
    pub fn latest(&self) -> &FeatureRow {
        // build() never returns an empty table
        &self.rows[self.rows.len() - 1]
    }

    /// Rows that carry both horizon targets. They always form a prefix.
    pub fn labelled_len(&self) -> usize {
        self.targets.iter().take_while(|t| t.is_some()).count()
    }

    /// Labelled rows and their targets, in series order.
    pub fn training_pairs(&self) -> (&[FeatureRow], Vec<TargetPair>) {
        let n = self.labelled_len();
        let targets = self.targets[..n].iter().flatten().copied().collect();
        (&self.rows[..n], targets)
    }

    /// Fails with `InsufficientTrainingData` when fewer than `minimum` usable rows exist.
    pub fn require_training_rows(&self, minimum: usize) -> Result<(), ForecastError> {
        if self.len() < minimum || self.labelled_len() == 0 {
            return Err(ForecastError::InsufficientTrainingData {
                rows: self.len(),
                required: minimum,
            });
        }
        Ok(())
    }

    /// All rows flattened in `layout` column order.
    pub fn matrix(&self, layout: &FeatureLayout) -> Vec<Vec<f64>> {
        self.rows.iter().map(|row| layout.to_vector(row)).collect()
    }
}

fn target_at(closes: &[f64], idx: usize) -> Option<TargetPair> {
    let next_day = closes.get(idx + Horizon::NextDay.offset())?;
    let next_week = closes.get(idx + Horizon::NextWeek.offset())?;
    Some(TargetPair {
        next_day: *next_day,
        next_week: *next_week,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn linear_bars(n: usize) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                PriceBar::flat(
                    start + Duration::days(i as i64),
                    Decimal::from(100 + i as i64),
                )
            })
            .collect()
    }

    #[test]
    fn test_too_short_series_has_no_rows() {
        let err = FeatureTable::build(&linear_bars(150)).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientHistory {
                bars: 150,
                required: 200
            }
        ));
    }

    #[test]
    fn test_targets_align_with_future_closes() {
        let table = FeatureTable::build(&linear_bars(230)).unwrap();

        assert_eq!(table.len(), 31);
        assert_eq!(table.labelled_len(), 26);

        let (rows, targets) = table.training_pairs();
        assert_eq!(rows.len(), targets.len());
        for (row, target) in rows.iter().zip(&targets) {
            assert_eq!(target.next_day, row.close + 1.0);
            assert_eq!(target.next_week, row.close + 5.0);
        }
        assert_eq!(table.latest().close, 329.0);
    }

    #[test]
    fn test_require_training_rows() {
        let table = FeatureTable::build(&linear_bars(250)).unwrap();
        assert_eq!(table.len(), 51);
        assert!(table.require_training_rows(50).is_ok());
        assert!(matches!(
            table.require_training_rows(100),
            Err(ForecastError::InsufficientTrainingData {
                rows: 51,
                required: 100
            })
        ));
    }

    #[test]
    fn test_matrix_follows_layout() {
        let table = FeatureTable::build(&linear_bars(210)).unwrap();
        let layout = FeatureLayout {
            include_macd_signal: false,
        };
        let matrix = table.matrix(&layout);
        assert_eq!(matrix.len(), table.len());
        assert!(matrix.iter().all(|r| r.len() == 8));
    }
}
