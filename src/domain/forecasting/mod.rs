pub mod stage;
pub mod types;

pub use stage::{ForecastStage, StageTracker};
pub use types::{
    Forecast, ForecastFailure, ForecastOutcome, ForecastReport, Horizon, IndicatorSnapshot,
    ModelSource, TargetPair,
};
