//! Feature pipeline: daily bars → fixed-order indicator rows + horizon targets.

pub mod dataset;
pub mod indicators;
pub mod volatility;

pub use dataset::FeatureTable;
pub use indicators::{IndicatorEngine, WARMUP_BARS, WilderRsi};
pub use volatility::expected_move;
