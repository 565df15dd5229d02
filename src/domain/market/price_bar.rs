use crate::domain::errors::ForecastError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// One daily trading session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl PriceBar {
    /// A bar whose open, high, low and close are all `close`.
    pub fn flat(date: NaiveDate, close: Decimal) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: Decimal::ZERO,
        }
    }

    /// Close as f64, the boundary type for indicator math.
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(f64::NAN)
    }
}

/// Checks the ordering and price invariants of a bar series.
///
/// Dates must be strictly increasing and every close strictly positive.
pub fn validate_series(bars: &[PriceBar]) -> Result<(), ForecastError> {
    if let Some(bad) = bars.iter().find(|b| b.close <= Decimal::ZERO) {
        return Err(ForecastError::InvalidInput {
            reason: format!("non-positive close {} on {}", bad.close, bad.date),
        });
    }

    if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(ForecastError::InvalidInput {
            reason: format!(
                "dates not strictly increasing: {} followed by {}",
                pair[0].date, pair[1].date
            ),
        });
    }

    Ok(())
}

/// Closes as f64 in series order.
pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(PriceBar::close_f64).collect()
}
