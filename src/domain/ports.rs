//! Boundaries to the collaborators that feed the forecasting core.
//!
//! Both providers report failure as [`ForecastError::UpstreamDataUnavailable`];
//! the caller decides whether a neutral fallback is acceptable.

use crate::domain::errors::ForecastError;
use crate::domain::market::PriceBar;
use crate::domain::sentiment::Headline;

pub trait PriceHistoryProvider: Send + Sync {
    /// Daily bars for `symbol`, oldest first.
    fn fetch_history(&self, symbol: &str) -> Result<Vec<PriceBar>, ForecastError>;
}

pub trait HeadlineProvider: Send + Sync {
    /// Up to `limit` most recent headlines for `symbol`.
    fn fetch_headlines(&self, symbol: &str, limit: usize) -> Result<Vec<Headline>, ForecastError>;
}
