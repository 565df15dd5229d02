use crate::domain::errors::{ErrorKind, ForecastError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Forward offset being forecast, in trading sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    NextDay,
    NextWeek,
}

impl Horizon {
    pub const ALL: [Horizon; 2] = [Horizon::NextDay, Horizon::NextWeek];

    /// Number of sessions ahead of the feature row.
    pub fn offset(&self) -> usize {
        match self {
            Horizon::NextDay => 1,
            Horizon::NextWeek => 5,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Horizon::NextDay => 0,
            Horizon::NextWeek => 1,
        }
    }

    /// Largest offset of any horizon; the trailing rows without targets.
    pub fn max_offset() -> usize {
        Self::ALL.iter().map(Horizon::offset).max().unwrap_or(0)
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Horizon::NextDay => write!(f, "t+1"),
            Horizon::NextWeek => write!(f, "t+5"),
        }
    }
}

/// Closing prices at each horizon, aligned to one feature row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPair {
    pub next_day: f64,
    pub next_week: f64,
}

impl TargetPair {
    pub fn get(&self, horizon: Horizon) -> f64 {
        match horizon {
            Horizon::NextDay => self.next_day,
            Horizon::NextWeek => self.next_week,
        }
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.next_day, self.next_week]
    }

    /// Re-expresses both targets as moves away from `anchor`.
    pub fn offsets_from(&self, anchor: f64) -> Self {
        Self {
            next_day: self.next_day - anchor,
            next_week: self.next_week - anchor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub next_day: f64,
    pub next_week: f64,
}

impl From<[f64; 2]> for Forecast {
    fn from(values: [f64; 2]) -> Self {
        Self {
            next_day: values[0],
            next_week: values[1],
        }
    }
}

/// Indicator readings at the latest session, reported alongside a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub sma200: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub sentiment: f64,
}

/// Whether the models behind a forecast were reused or freshly fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Cached,
    Trained,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub symbol: String,
    pub forecast: Forecast,
    pub indicators: IndicatorSnapshot,
    /// One-sigma price move implied by recent daily return volatility.
    pub expected_move: f64,
    pub confidence: f64,
    pub latest_close: f64,
    pub model_source: ModelSource,
    pub sequence_used: bool,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastFailure {
    pub symbol: String,
    pub error_kind: ErrorKind,
    pub message: String,
}

impl ForecastFailure {
    pub fn from_error(symbol: &str, error: &ForecastError) -> Self {
        Self {
            symbol: symbol.to_string(),
            error_kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Structured result of one request; failures are values, not panics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForecastOutcome {
    Ok(ForecastReport),
    Failed(ForecastFailure),
}

impl ForecastOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ForecastOutcome::Ok(_))
    }

    pub fn symbol(&self) -> &str {
        match self {
            ForecastOutcome::Ok(report) => &report.symbol,
            ForecastOutcome::Failed(failure) => &failure.symbol,
        }
    }
}
