// Raw market data consumed by the forecasting pipeline
pub mod price_bar;
pub mod symbol;

pub use price_bar::{PriceBar, validate_series};
pub use symbol::{normalize_symbol, validate_symbol};
